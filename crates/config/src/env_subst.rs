/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw
/// config text before it is parsed.
///
/// Unresolvable variables without a fallback are left as-is so the parse
/// error (or the literal value) points at the missing variable.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated, emit the remainder literally.
            out.push_str(&rest[start..]);
            return out;
        };

        let expr = &after[..end];
        let (name, fallback) = match expr.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (expr, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => out.push_str(&value),
            (false, None, Some(fallback)) => out.push_str(fallback),
            _ => {
                out.push_str("${");
                out.push_str(expr);
                out.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "CHATRELAY_TEST_URL" => Some("http://backend:8080".into()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("url = \"${CHATRELAY_TEST_URL}/chat\"", lookup),
            "url = \"http://backend:8080/chat\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${CHATRELAY_NOPE}", lookup),
            "${CHATRELAY_NOPE}"
        );
    }

    #[test]
    fn uses_fallback_when_unset() {
        assert_eq!(substitute_env_with("${CHATRELAY_NOPE:-30}", lookup), "30");
        assert_eq!(
            substitute_env_with("${CHATRELAY_TEST_URL:-x}", lookup),
            "http://backend:8080"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
