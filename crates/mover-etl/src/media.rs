//! Bounded-concurrency download of media files referenced by extracted rows

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use mover_config::SchemaOverride;
use mover_core::{MoverError, Result, Row, Value};

/// Absolute URLs for every downloadable column value in the table's result
/// sets: the column override's base URL prefixed to the stored path.
pub(crate) fn media_urls(config: &SchemaOverride, sets: &[Vec<Row>]) -> Vec<String> {
    let mut urls = Vec::new();
    for rule in &config.columns {
        let Some(download) = &rule.download else {
            continue;
        };
        for set in sets {
            for row in set {
                if let Some(Value::String(path)) = row.get(&rule.name) {
                    if !path.is_empty() {
                        urls.push(download.http.url(path));
                    }
                }
            }
        }
    }
    urls
}

/// Fetch every URL with at most `concurrency` requests in flight. All
/// fetches run to completion; the first failure is surfaced afterwards.
pub(crate) async fn download_files(
    urls: &[String],
    output_dir: &Path,
    concurrency: usize,
) -> Result<()> {
    let client = reqwest::Client::new();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut handles = Vec::with_capacity(urls.len());
    for url in urls {
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let url = url.clone();
        let output_dir = output_dir.to_path_buf();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| MoverError::Download(e.to_string()))?;
            download_file(&client, &url, &output_dir).await
        }));
    }

    let mut first_error = None;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| MoverError::Download(e.to_string()))
            .and_then(|result| result);
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "media download failed");
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn download_file(client: &reqwest::Client, url: &str, output_dir: &Path) -> Result<()> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MoverError::Download(format!("unable to retrieve {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(MoverError::Download(format!(
            "unable to download {}: received {} HTTP code",
            url,
            response.status().as_u16()
        )));
    }

    let local_path = local_media_path(url, output_dir)
        .ok_or_else(|| MoverError::Download(format!("unable to parse {}", url)))?;
    if let Some(parent) = local_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(&local_path).await?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| MoverError::Download(format!("unable to read body of {}: {}", url, e)))?
    {
        file.write_all(&chunk).await?;
    }

    tracing::debug!(url = %url, path = %local_path.display(), "downloaded");
    Ok(())
}

/// Local destination derived from the URL's path component.
fn local_media_path(url: &str, output_dir: &Path) -> Option<PathBuf> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let relative = parsed.path().trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    Some(output_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mover_config::Config;

    fn download_config() -> SchemaOverride {
        let config: Config = serde_json::from_str(
            r#"{"schema": [{"table_name": "user", "columns": [
                {"name": "avatar", "download": {"type": "http",
                 "http": {"base_url": "https://cdn.example.com"}}}
            ]}]}"#,
        )
        .unwrap();
        config.schema[0].clone()
    }

    #[test]
    fn test_media_urls_prefixes_base_url() {
        let sets = vec![vec![
            Row::new(
                vec!["id".into(), "avatar".into()],
                vec![Value::Int64(1), Value::String("/a/1.png".into())],
            ),
            Row::new(
                vec!["id".into(), "avatar".into()],
                vec![Value::Int64(2), Value::String(String::new())],
            ),
            Row::new(
                vec!["id".into(), "avatar".into()],
                vec![Value::Int64(3), Value::Null],
            ),
        ]];

        let urls = media_urls(&download_config(), &sets);
        assert_eq!(urls, vec!["https://cdn.example.com/a/1.png"]);
    }

    #[test]
    fn test_media_urls_without_download_rules_is_empty() {
        let config = SchemaOverride::default();
        let sets = vec![vec![Row::new(
            vec!["avatar".into()],
            vec![Value::String("/a.png".into())],
        )]];
        assert!(media_urls(&config, &sets).is_empty());
    }

    #[test]
    fn test_local_media_path_mirrors_url_path() {
        let path = local_media_path(
            "https://cdn.example.com/avatars/7/full.png",
            Path::new("/out/media"),
        )
        .unwrap();
        assert_eq!(path, Path::new("/out/media/avatars/7/full.png"));
    }

    #[test]
    fn test_local_media_path_rejects_pathless_urls() {
        assert!(local_media_path("https://cdn.example.com", Path::new("/out")).is_none());
        assert!(local_media_path("not a url", Path::new("/out")).is_none());
    }
}
