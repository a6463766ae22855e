use reqwest::Url;

pub const UTM_KEYS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

/// UTM parameters present (and non-empty) on `url`, in `UTM_KEYS` order.
pub fn utm_params(url: &Url) -> Vec<(&'static str, String)> {
    UTM_KEYS
        .iter()
        .filter_map(|key| {
            url.query_pairs()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| (*key, v.into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_known_keys_only() {
        let url = Url::parse(
            "https://shine.example/?utm_campaign=spring%20detail&gclid=x&utm_source=google&utm_term=",
        )
        .unwrap();
        assert_eq!(
            utm_params(&url),
            vec![
                ("utm_source", "google".to_string()),
                ("utm_campaign", "spring detail".to_string()),
            ]
        );
    }
}
