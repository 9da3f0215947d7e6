//! Browser and vendor-prefix data model.
//!
//! The tables in [`prefixes`] record, per prefixable name, the last version
//! of each browser that still required a vendor prefix. The
//! [`SupportMatrix`] is the user-supplied declaration of which browsers and
//! versions the output CSS must support; combining the two drives every
//! prefix decision in [`crate::plugin::prefixer`].

pub mod prefixes;

use std::collections::BTreeMap;

/// A vendor prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prefix {
    /// `-webkit-`
    Webkit,
    /// `-moz-`
    Moz,
    /// `-ms-`
    Ms,
    /// `-o-`
    O,
}

impl Prefix {
    /// The prefix including both dashes, e.g. `-moz-`.
    pub fn symbol(self) -> &'static str {
        match self {
            Prefix::Webkit => "-webkit-",
            Prefix::Moz => "-moz-",
            Prefix::Ms => "-ms-",
            Prefix::O => "-o-",
        }
    }

    /// Parses a prefix from its dashless name, ASCII case-insensitively.
    pub fn from_name(name: &str) -> Option<Prefix> {
        if name.eq_ignore_ascii_case("webkit") {
            Some(Prefix::Webkit)
        } else if name.eq_ignore_ascii_case("moz") {
            Some(Prefix::Moz)
        } else if name.eq_ignore_ascii_case("ms") {
            Some(Prefix::Ms)
        } else if name.eq_ignore_ascii_case("o") {
            Some(Prefix::O)
        } else {
            None
        }
    }

    /// Splits a `-prefix-name` string into its prefix and unprefixed
    /// remainder, if the leading segment is a known vendor prefix.
    pub fn split(name: &str) -> Option<(Prefix, &str)> {
        let rest = name.strip_prefix('-')?;
        let dash = rest.find('-')?;
        let prefix = Prefix::from_name(&rest[..dash])?;
        Some((prefix, &rest[dash + 1..]))
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A browser tracked by the prefix data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    IosSafari,
    Android,
    Ie,
    Edge,
    Opera,
}

impl Browser {
    /// The vendor prefix this browser used.
    pub fn prefix(self) -> Prefix {
        match self {
            Browser::Chrome | Browser::Safari | Browser::IosSafari | Browser::Android => {
                Prefix::Webkit
            }
            Browser::Firefox => Prefix::Moz,
            Browser::Ie | Browser::Edge => Prefix::Ms,
            Browser::Opera => Prefix::O,
        }
    }

    /// The most recent version this crate's data knows about.
    pub fn latest(self) -> f64 {
        match self {
            Browser::Chrome => 46.0,
            Browser::Firefox => 42.0,
            Browser::Safari => 9.0,
            Browser::IosSafari => 9.0,
            Browser::Android => 44.0,
            Browser::Ie => 11.0,
            Browser::Edge => 12.0,
            Browser::Opera => 33.0,
        }
    }
}

/// A specific version of a specific browser.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrowserVersion {
    pub browser: Browser,
    pub version: f64,
}

/// The set of browsers and versions the output CSS must support.
///
/// ```
/// use horizon_cascade::data::{Browser, SupportMatrix};
///
/// let mut support = SupportMatrix::default();
/// support.browser(Browser::Firefox, 25).latest(Browser::Chrome);
/// assert!(support.supports(Browser::Firefox, 25.0));
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SupportMatrix {
    versions: BTreeMap<Browser, Vec<f64>>,
}

impl SupportMatrix {
    /// Declares support for a specific browser version.
    pub fn browser(&mut self, browser: Browser, version: impl Into<f64>) -> &mut Self {
        self.versions.entry(browser).or_default().push(version.into());
        self
    }

    /// Declares support for the latest known version of a browser.
    pub fn latest(&mut self, browser: Browser) -> &mut Self {
        self.browser(browser, browser.latest())
    }

    /// True if no browsers have been declared.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// True if the given browser version has been declared.
    pub fn supports(&self, browser: Browser, version: f64) -> bool {
        self.versions
            .get(&browser)
            .map(|versions| versions.contains(&version))
            .unwrap_or(false)
    }

    /// The declared browsers with their versions, in stable order.
    pub fn browsers(&self) -> impl Iterator<Item = (Browser, &[f64])> {
        self.versions.iter().map(|(browser, versions)| (*browser, versions.as_slice()))
    }

    /// Collects the prefixes required for a prefixable name, given a lookup
    /// from (name, browser) to the last version requiring a prefix.
    pub(crate) fn required_prefixes(
        &self,
        name: &str,
        last_prefixed: impl Fn(&str, Browser) -> Option<f64>,
    ) -> Vec<Prefix> {
        let mut required = Vec::new();
        for (browser, versions) in self.browsers() {
            if let Some(last) = last_prefixed(name, browser) {
                if versions.iter().any(|v| *v <= last) {
                    let prefix = browser.prefix();
                    if !required.contains(&prefix) {
                        required.push(prefix);
                    }
                }
            }
        }
        required.sort();
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_known_prefixes() {
        assert_eq!(Prefix::split("-moz-selection"), Some((Prefix::Moz, "selection")));
        assert_eq!(Prefix::split("-webkit-border-radius"), Some((Prefix::Webkit, "border-radius")));
        assert_eq!(Prefix::split("selection"), None);
        assert_eq!(Prefix::split("-fancy-thing"), None);
    }

    #[test]
    fn browsers_map_to_prefixes() {
        assert_eq!(Browser::Firefox.prefix(), Prefix::Moz);
        assert_eq!(Browser::Chrome.prefix(), Prefix::Webkit);
        assert_eq!(Browser::Ie.prefix(), Prefix::Ms);
        assert_eq!(Browser::Opera.prefix(), Prefix::O);
    }

    #[test]
    fn required_prefixes_respects_versions() {
        let mut support = SupportMatrix::default();
        support.browser(Browser::Firefox, 25);

        let required = support.required_prefixes("selection", prefixes::last_version_selector_prefixed);
        assert_eq!(required, vec![Prefix::Moz]);

        let mut none = SupportMatrix::default();
        none.browser(Browser::Firefox, 9999);
        let required = none.required_prefixes("selection", prefixes::last_version_selector_prefixed);
        assert!(required.is_empty());
    }
}
