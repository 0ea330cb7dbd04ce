//! Artwork URLs attached to instructions and tolls.

use serde::{Deserialize, Serialize};

/// Default bucket for instruction icons.
pub const DEFAULT_ICON_BASE_URL: &str = "https://plates-routes.s3.us-east-1.amazonaws.com";
/// Default bucket for concession artwork.
pub const DEFAULT_CONCESSION_IMG_BASE_URL: &str =
    "https://dealership-routes.s3.us-east-1.amazonaws.com";
/// Default bucket for toll tag logos.
pub const DEFAULT_TAG_IMG_BASE_URL: &str = "https://tags-tolls.s3.us-east-1.amazonaws.com";

/// Concessions whose artwork does not follow the slug rule.
const CONCESSION_OVERRIDES: &[(&str, &str)] = &[
    ("RODOANEL OESTE", "ccr_rodoanel"),
    ("ECO 050", "eco50"),
    ("CSG - Free Flow", "csg"),
    ("EPR TRIANGULO", "epr-triangulo"),
    ("EPR VIA MINEIRA", "epr-via-mineira"),
    ("CCR RioSP", "ccr-riosp"),
    ("CONCEBRA", "truinfo_concebra"),
    ("VIA BRASIL - MT-100", "via_brasil___mt_100"),
];

/// Tag brands with a logo, keyed by the name stored in `toll_tags`.
const TAG_ICONS: &[(&str, &str)] = &[
    ("veloe", "veloe"),
    ("semParar", "semparar"),
    ("moveMais", "moveMais"),
    ("greenPass", "greenpass"),
    ("ecotaggy", "ecotaggy"),
    ("autoExpresso", "auto-expresso"),
    ("c6Taggy", "c6-tag"),
    ("dBTrans", "dbTrans"),
    ("taggy", "taggy"),
    ("conectCar", "conectcar"),
];

/// Base URLs for every piece of artwork the planner links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUrls {
    /// Instruction icons.
    pub icon_base_url: String,
    /// Concession artwork.
    pub concession_img_base_url: String,
    /// Toll tag logos.
    pub tag_img_base_url: String,
}

impl Default for AssetUrls {
    fn default() -> Self {
        Self {
            icon_base_url: DEFAULT_ICON_BASE_URL.to_owned(),
            concession_img_base_url: DEFAULT_CONCESSION_IMG_BASE_URL.to_owned(),
            tag_img_base_url: DEFAULT_TAG_IMG_BASE_URL.to_owned(),
        }
    }
}

impl AssetUrls {
    /// Replace the instruction icon base.
    #[must_use]
    pub fn with_icon_base_url(mut self, base: impl Into<String>) -> Self {
        self.icon_base_url = base.into();
        self
    }

    /// URL of an instruction icon, e.g. `reto`.
    #[must_use]
    pub fn icon(&self, name: &str) -> String {
        join(&self.icon_base_url, name)
    }

    /// URL of a concession's artwork; empty for a blank concession.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollroute_core::assets::AssetUrls;
    ///
    /// let urls = AssetUrls::default();
    /// assert!(urls.concession_image("ROTA DO ATLÂNTICO").ends_with("/rota_do_atlantico.png"));
    /// assert!(urls.concession_image("CCR RioSP").ends_with("/ccr-riosp.png"));
    /// assert_eq!(urls.concession_image("  "), "");
    /// ```
    #[must_use]
    pub fn concession_image(&self, concession: &str) -> String {
        let trimmed = concession.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let name = CONCESSION_OVERRIDES
            .iter()
            .find(|(raw, _)| raw.eq_ignore_ascii_case(trimmed))
            .map_or_else(|| slug(trimmed), |(_, file)| (*file).to_owned());
        join(&self.concession_img_base_url, &name)
    }

    /// Logo URL for a tag brand, if it has one.
    #[must_use]
    pub fn tag_icon(&self, tag: &str) -> Option<String> {
        TAG_ICONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag.trim()))
            .map(|(_, file)| join(&self.tag_img_base_url, file))
    }
}

fn join(base: &str, file: &str) -> String {
    format!("{}/{file}.png", base.trim_end_matches('/'))
}

/// Lowercase ASCII slug joining alphanumeric runs with `_`.
#[must_use]
pub fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_gap = false;
    for ch in raw.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if ch.is_ascii_alphanumeric() {
            if pending_gap && !out.is_empty() {
                out.push('_');
            }
            pending_gap = false;
            out.push(ch);
        } else {
            pending_gap = true;
        }
    }
    out
}

const fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("RODOVIAS DO TIETÊ", "rodovias_do_tiete")]
    #[case("WAY - 306", "way_306")]
    #[case("Associação Gleba Barreiro", "associacao_gleba_barreiro")]
    #[case("  ECO101 ", "eco101")]
    fn slugs_concession_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(slug(raw), expected);
    }

    #[rstest]
    fn override_wins_over_slug() {
        let urls = AssetUrls::default();
        assert_eq!(
            urls.concession_image("VIA BRASIL - MT-100"),
            "https://dealership-routes.s3.us-east-1.amazonaws.com/via_brasil___mt_100.png"
        );
    }

    #[rstest]
    #[case("semParar", Some("https://tags-tolls.s3.us-east-1.amazonaws.com/semparar.png"))]
    #[case("SEMPARAR", Some("https://tags-tolls.s3.us-east-1.amazonaws.com/semparar.png"))]
    #[case("unknownTag", None)]
    fn maps_tag_icons(#[case] tag: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            AssetUrls::default().tag_icon(tag).as_deref(),
            expected
        );
    }

    #[rstest]
    fn icon_base_trailing_slash_is_ignored() {
        let urls = AssetUrls::default().with_icon_base_url("http://icons.local/");
        assert_eq!(urls.icon("reto"), "http://icons.local/reto.png");
    }
}
