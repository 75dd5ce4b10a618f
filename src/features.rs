//! URL feature extraction for the phishing classifier.
//!
//! Produces the six inputs the trained model expects, in training order.
//! Field names on the wire match the training dataset's column names.

use serde::{Deserialize, Serialize};

use crate::observations::Row;

/// Column names in the order the classifier was trained on.
pub const FEATURE_NAMES: [&str; 6] = [
    "Abnormal_URL",
    "Prefix_Suffix",
    "SSLfinal_State",
    "Shortining_Service",
    "having_At_Symbol",
    "having_Sub_Domain",
];

const SHORTENERS: [&str; 8] = [
    "bit.ly", "goo.gl", "tinyurl", "ow.ly", "t.co", "is.gd", "buff.ly", "adf.ly",
];

/// Feature vector for one URL.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFeatures {
    /// 1 when the URL starts with digits (IP-like host) or is very long.
    #[serde(rename = "Abnormal_URL")]
    pub abnormal_url: i8,
    /// 1 when the scheme/host prefix contains a dash.
    #[serde(rename = "Prefix_Suffix")]
    pub prefix_suffix: i8,
    /// 1 for https, -1 for plain http, 0 otherwise.
    #[serde(rename = "SSLfinal_State")]
    pub ssl_final_state: i8,
    /// 1 when a known URL shortener appears.
    #[serde(rename = "Shortining_Service")]
    pub shortening_service: i8,
    #[serde(rename = "having_At_Symbol")]
    pub having_at_symbol: i8,
    /// 0 for `example.com`, 1 for `www.example.com`, 2 for deeper nesting.
    #[serde(rename = "having_Sub_Domain")]
    pub having_sub_domain: i8,
}

impl UrlFeatures {
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            f64::from(self.abnormal_url),
            f64::from(self.prefix_suffix),
            f64::from(self.ssl_final_state),
            f64::from(self.shortening_service),
            f64::from(self.having_at_symbol),
            f64::from(self.having_sub_domain),
        ]
    }

    /// Named row suitable for an observation batch.
    pub fn to_row(&self) -> Row {
        FEATURE_NAMES
            .iter()
            .zip(self.to_vector())
            .map(|(name, v)| (name.to_string(), Some(v)))
            .collect()
    }
}

/// Extract the classifier features from a URL (or any pasted text).
pub fn extract(text: &str) -> UrlFeatures {
    let abnormal_url = text.chars().take(20).any(|c| c.is_ascii_digit()) || text.chars().count() > 100;

    let prefix_suffix = match text.split_once("//") {
        Some((scheme, _)) => scheme.contains('-'),
        None => text.chars().take(30).any(|c| c == '-'),
    };

    let ssl_final_state = if text.starts_with("https://") {
        1
    } else if text.starts_with("http://") {
        -1
    } else {
        0
    };

    let lower = text.to_lowercase();
    let shortening_service = SHORTENERS.iter().any(|s| lower.contains(s));

    let host = match text.split_once("//") {
        Some((_, rest)) => rest.split('/').next().unwrap_or(rest),
        None => text,
    };
    let having_sub_domain = match host.matches('.').count() {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    };

    UrlFeatures {
        abnormal_url: i8::from(abnormal_url),
        prefix_suffix: i8::from(prefix_suffix),
        ssl_final_state,
        shortening_service: i8::from(shortening_service),
        having_at_symbol: i8::from(text.contains('@')),
        having_sub_domain,
    }
}
