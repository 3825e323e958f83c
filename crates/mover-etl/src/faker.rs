//! Locale-aware fake value generation for the sanitizer
//!
//! Small word tables sampled with `rand`. The surface is a single
//! `generate` function keyed by tag, so swapping the generator out never
//! touches the sanitizer logic.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Locale {
    En,
    Fr,
}

impl Locale {
    pub(crate) fn from_tag(tag: &str) -> Self {
        match tag {
            "fr" => Locale::Fr,
            _ => Locale::En,
        }
    }
}

const LAST_NAMES_EN: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White",
];

const LAST_NAMES_FR: &[&str] = &[
    "Martin", "Bernard", "Thomas", "Petit", "Robert", "Richard", "Durand", "Dubois", "Moreau",
    "Laurent", "Simon", "Michel", "Lefebvre", "Leroy", "Roux", "David", "Bertrand", "Morel",
    "Fournier", "Girard", "Bonnet", "Dupont", "Lambert", "Fontaine",
];

const FIRST_NAMES_EN: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas",
    "Sarah", "Charles", "Karen", "Christopher", "Lisa", "Daniel", "Nancy",
];

const FIRST_NAMES_FR: &[&str] = &[
    "Jean", "Marie", "Pierre", "Jeanne", "Michel", "Francoise", "Andre", "Monique", "Philippe",
    "Catherine", "Rene", "Nathalie", "Louis", "Isabelle", "Alain", "Jacqueline", "Jacques",
    "Anne", "Bernard", "Sylvie", "Marcel", "Martine", "Daniel", "Nicole",
];

const STREET_NAMES_EN: &[&str] = &[
    "Oak", "Maple", "Cedar", "Pine", "Elm", "Washington", "Lake", "Hill", "Park", "Main",
    "Church", "High", "Mill", "Walnut", "Spring", "North",
];

const STREET_SUFFIXES_EN: &[&str] = &["Street", "Avenue", "Road", "Lane", "Drive", "Boulevard"];

const STREET_NAMES_FR: &[&str] = &[
    "de la Paix", "Victor Hugo", "de la Republique", "des Ecoles", "du Moulin", "Pasteur",
    "des Lilas", "Jean Jaures", "du Chateau", "de l'Eglise", "des Tilleuls", "Saint-Honore",
    "de Verdun", "Nationale", "du Port", "des Vignes",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

fn pick<'a>(rng: &mut impl Rng, list: &'a [&'a str]) -> &'a str {
    list[rng.gen_range(0..list.len())]
}

fn last_name(rng: &mut impl Rng, locale: Locale) -> String {
    match locale {
        Locale::En => pick(rng, LAST_NAMES_EN).to_string(),
        Locale::Fr => pick(rng, LAST_NAMES_FR).to_string(),
    }
}

fn first_name(rng: &mut impl Rng, locale: Locale) -> String {
    match locale {
        Locale::En => pick(rng, FIRST_NAMES_EN).to_string(),
        Locale::Fr => pick(rng, FIRST_NAMES_FR).to_string(),
    }
}

fn email(rng: &mut impl Rng, locale: Locale) -> String {
    format!(
        "{}.{}{}@{}",
        first_name(rng, locale).to_lowercase(),
        last_name(rng, locale).to_lowercase().replace([' ', '\''], "-"),
        rng.gen_range(1..10_000),
        pick(rng, EMAIL_DOMAINS)
    )
}

fn street_address(rng: &mut impl Rng, locale: Locale) -> String {
    match locale {
        Locale::En => format!(
            "{} {} {}",
            rng.gen_range(1..2000),
            pick(rng, STREET_NAMES_EN),
            pick(rng, STREET_SUFFIXES_EN)
        ),
        Locale::Fr => format!("{} rue {}", rng.gen_range(1..200), pick(rng, STREET_NAMES_FR)),
    }
}

fn phone_number(rng: &mut impl Rng, locale: Locale) -> String {
    match locale {
        Locale::En => format!(
            "({:03}) {:03}-{:04}",
            rng.gen_range(200..1000),
            rng.gen_range(200..1000),
            rng.gen_range(0..10_000)
        ),
        Locale::Fr => {
            let mut digits = String::from("06");
            for _ in 0..4 {
                digits.push_str(&format!(" {:02}", rng.gen_range(0..100)));
            }
            digits
        }
    }
}

/// Generate a fake value for a tag, or `None` when the tag is unknown.
pub(crate) fn generate(rng: &mut impl Rng, locale: Locale, tag: &str) -> Option<String> {
    match tag {
        "last_name" => Some(last_name(rng, locale)),
        "first_name" => Some(first_name(rng, locale)),
        "email" => Some(email(rng, locale)),
        "street_address" => Some(street_address(rng, locale)),
        "phone_number" => Some(phone_number(rng, locale)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_known_tags_generate_values() {
        let mut rng = StdRng::seed_from_u64(1);
        for tag in ["last_name", "first_name", "email", "street_address", "phone_number"] {
            let value = generate(&mut rng, Locale::En, tag).unwrap();
            assert!(!value.is_empty(), "{} produced an empty value", tag);
        }
    }

    #[test]
    fn test_unknown_tag_generates_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generate(&mut rng, Locale::En, "iban"), None);
    }

    #[test]
    fn test_email_has_local_part_and_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        let email = generate(&mut rng, Locale::Fr, "email").unwrap();
        let (local, domain) = email.split_once('@').unwrap();
        assert!(!local.is_empty());
        assert!(EMAIL_DOMAINS.contains(&domain));
    }

    #[test]
    fn test_locale_tag_selection() {
        assert_eq!(Locale::from_tag("fr"), Locale::Fr);
        assert_eq!(Locale::from_tag(""), Locale::En);
        assert_eq!(Locale::from_tag("en"), Locale::En);
    }
}
