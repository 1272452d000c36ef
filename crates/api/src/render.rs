/// Splits `locale` from the query string; everything else is tracking context.
pub fn split_locale(
    params: Vec<(String, String)>,
    default_locale: &str,
) -> (String, Vec<(String, String)>) {
    let mut locale = None;
    let mut incoming = Vec::with_capacity(params.len());
    for (k, v) in params {
        if k == "locale" {
            if locale.is_none() && !v.trim().is_empty() {
                locale = Some(v.trim().to_string());
            }
        } else {
            incoming.push((k, v));
        }
    }
    (locale.unwrap_or_else(|| default_locale.to_string()), incoming)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_is_split_from_tracking_params() {
        let params = vec![
            ("utm_source".to_string(), "fb".to_string()),
            ("locale".to_string(), "pt-PT".to_string()),
        ];
        let (locale, incoming) = split_locale(params, "en");
        assert_eq!(locale, "pt-PT");
        assert_eq!(incoming, vec![("utm_source".to_string(), "fb".to_string())]);

        let (locale, _) = split_locale(Vec::new(), "en");
        assert_eq!(locale, "en");
    }
}
