//! Value validators a tag definition can attach to its value, body or parameters.

use crate::html;

/// Schemes a link may keep. Anything else gets `http://` in front of it.
const LINK_SCHEMES: &[&str] = &["http://", "https://", "ftp://", "ftps://", "mailto:"];

const FONT_SIZES: [&str; 7] = ["8pt", "10pt", "12pt", "14pt", "18pt", "24pt", "36pt"];

/// The closed set of validation steps available to tag definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Validator {
    /// Link target: line breaks dropped, unknown or missing scheme replaced by `http://`,
    /// brackets neutralized.
    Url,
    /// Image source, same rules as [Validator::Url].
    Image,
    /// Email address: line breaks dropped.
    Email,
    /// Code body: tabs kept visible, brackets neutralized.
    Code,
    /// Verbatim body: brackets neutralized.
    Literal,
    /// `1`..`7` mapped to point sizes.
    FontSize,
}

impl Validator {
    /// Validate the first argument in place.
    /// # Remarks
    /// For content kinds with a body the body is the first argument, otherwise the value is.
    pub fn apply(self, args: &mut [String]) {
        let Some(first) = args.first_mut() else {
            return;
        };

        let validated = self.validate(first);
        *first = validated;
    }

    pub fn validate(self, value: &str) -> String {
        match self {
            Self::Url | Self::Image => {
                html::escape_brackets(&normalize_link(&value.replace("<br>", ""))).into_owned()
            }
            Self::Email => value.replace("<br>", ""),
            Self::Code => {
                html::escape_brackets(&value.replace('\t', "<span class=\"tab\">\t</span>"))
                    .into_owned()
            }
            Self::Literal => html::escape_brackets(value).into_owned(),
            Self::FontSize => match value.trim().parse::<usize>() {
                Ok(n @ 1..=7) => FONT_SIZES[n - 1].to_owned(),
                _ => value.to_owned(),
            },
        }
    }
}

fn normalize_link(value: &str) -> String {
    let value = value.trim();
    let has_scheme = LINK_SCHEMES.iter().any(|scheme| {
        value.len() >= scheme.len() && value.as_bytes()[..scheme.len()].eq_ignore_ascii_case(scheme.as_bytes())
    });

    if has_scheme {
        value.to_owned()
    } else {
        format!("http://{}", value.trim_start_matches([':', '/']))
    }
}

#[cfg(test)]
mod tests {
    use super::Validator;

    #[test]
    fn links_get_a_scheme() {
        assert_eq!(Validator::Url.validate("example.com"), "http://example.com");
        assert_eq!(Validator::Url.validate("HTTPS://x.org"), "HTTPS://x.org");
        assert_eq!(Validator::Url.validate("://x.org"), "http://x.org");
        assert_eq!(
            Validator::Url.validate("javascript:alert(1)"),
            "http://javascript:alert(1)"
        );
        assert_eq!(Validator::Image.validate("a.png<br>"), "http://a.png");
    }

    #[test]
    fn links_never_carry_tags() {
        assert_eq!(
            Validator::Url.validate("http://x.com/[b]y"),
            "http://x.com/&#91;b&#93;y"
        );
    }

    #[test]
    fn code_is_never_reparsed() {
        assert_eq!(
            Validator::Code.validate("[b]\tx"),
            "&#91;b&#93;<span class=\"tab\">\t</span>x"
        );
    }

    #[test]
    fn font_sizes() {
        assert_eq!(Validator::FontSize.validate("3"), "12pt");
        assert_eq!(Validator::FontSize.validate("9"), "9");
    }

    #[test]
    fn apply_touches_only_the_first_argument() {
        let mut args = vec!["a@b.c<br>".to_owned(), "keep<br>".to_owned()];
        Validator::Email.apply(&mut args);
        assert_eq!(args, ["a@b.c", "keep<br>"]);
    }
}
