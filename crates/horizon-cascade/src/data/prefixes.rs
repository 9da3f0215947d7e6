//! Vendor prefix requirement tables.
//!
//! Each entry records the last version of a browser that required a vendor
//! prefix for a name; absence means the browser never required one. The
//! tables are a hand-curated subset of caniuse data covering the names the
//! built-in prefixer handles.

use super::Browser;

type Entry = (&'static str, Browser, f64);

const PROPERTIES: &[Entry] = &[
    ("border-radius", Browser::Chrome, 4.0),
    ("border-radius", Browser::Safari, 4.0),
    ("border-radius", Browser::Firefox, 3.6),
    ("border-radius", Browser::Android, 2.1),
    ("border-radius", Browser::IosSafari, 3.2),
    ("box-shadow", Browser::Chrome, 9.0),
    ("box-shadow", Browser::Safari, 5.0),
    ("box-shadow", Browser::Firefox, 3.6),
    ("box-shadow", Browser::Android, 3.0),
    ("box-shadow", Browser::IosSafari, 4.3),
    ("animation", Browser::Chrome, 42.0),
    ("animation", Browser::Safari, 8.0),
    ("animation", Browser::Firefox, 15.0),
    ("animation", Browser::Android, 44.0),
    ("animation", Browser::IosSafari, 8.4),
    ("animation", Browser::Opera, 29.0),
    ("transition", Browser::Chrome, 25.0),
    ("transition", Browser::Safari, 6.0),
    ("transition", Browser::Firefox, 15.0),
    ("transition", Browser::Android, 4.3),
    ("transition", Browser::IosSafari, 6.1),
    ("transition", Browser::Opera, 12.0),
    ("transform", Browser::Chrome, 35.0),
    ("transform", Browser::Safari, 8.0),
    ("transform", Browser::Firefox, 15.0),
    ("transform", Browser::Ie, 9.0),
    ("transform", Browser::Android, 44.0),
    ("transform", Browser::IosSafari, 8.4),
    ("transform", Browser::Opera, 22.0),
    ("flex-wrap", Browser::Chrome, 28.0),
    ("flex-wrap", Browser::Safari, 8.0),
    ("flex-wrap", Browser::IosSafari, 8.4),
    ("user-select", Browser::Chrome, 46.0),
    ("user-select", Browser::Safari, 9.0),
    ("user-select", Browser::Firefox, 42.0),
    ("user-select", Browser::Ie, 11.0),
    ("user-select", Browser::Edge, 12.0),
];

const FUNCTIONS: &[Entry] = &[
    ("calc", Browser::Chrome, 25.0),
    ("calc", Browser::Safari, 6.0),
    ("calc", Browser::Firefox, 15.0),
    ("calc", Browser::IosSafari, 6.1),
    ("linear-gradient", Browser::Chrome, 25.0),
    ("linear-gradient", Browser::Safari, 6.0),
    ("linear-gradient", Browser::Firefox, 15.0),
    ("linear-gradient", Browser::Android, 4.3),
    ("linear-gradient", Browser::IosSafari, 6.1),
    ("linear-gradient", Browser::Opera, 12.0),
];

const AT_RULES: &[Entry] = &[
    ("keyframes", Browser::Chrome, 42.0),
    ("keyframes", Browser::Safari, 8.0),
    ("keyframes", Browser::Firefox, 15.0),
    ("keyframes", Browser::Android, 44.0),
    ("keyframes", Browser::IosSafari, 8.4),
    ("keyframes", Browser::Opera, 29.0),
];

const SELECTORS: &[Entry] = &[
    ("selection", Browser::Firefox, 61.0),
    ("placeholder", Browser::Chrome, 56.0),
    ("placeholder", Browser::Safari, 10.0),
    ("placeholder", Browser::Firefox, 50.0),
    ("placeholder", Browser::Ie, 11.0),
    ("placeholder", Browser::Edge, 12.0),
    ("fullscreen", Browser::Chrome, 14.0),
    ("fullscreen", Browser::Safari, 5.1),
    ("fullscreen", Browser::Firefox, 46.0),
    ("fullscreen", Browser::Ie, 11.0),
];

fn lookup(table: &[Entry], name: &str, browser: Browser) -> Option<f64> {
    table
        .iter()
        .find(|(n, b, _)| *b == browser && n.eq_ignore_ascii_case(name))
        .map(|(_, _, version)| *version)
}

fn known(table: &[Entry], name: &str) -> bool {
    table.iter().any(|(n, _, _)| n.eq_ignore_ascii_case(name))
}

/// Whether prefix data exists for the given property name.
pub fn is_prefixable_property(name: &str) -> bool {
    known(PROPERTIES, name)
}

/// Whether prefix data exists for the given function name.
pub fn is_prefixable_function(name: &str) -> bool {
    known(FUNCTIONS, name)
}

/// Whether prefix data exists for the given at-rule name.
pub fn is_prefixable_at_rule(name: &str) -> bool {
    known(AT_RULES, name)
}

/// Whether prefix data exists for the given selector name.
pub fn is_prefixable_selector(name: &str) -> bool {
    known(SELECTORS, name)
}

/// Last version of `browser` requiring a prefix for the property, or `None`
/// if the browser never required one.
pub fn last_version_property_prefixed(name: &str, browser: Browser) -> Option<f64> {
    lookup(PROPERTIES, name, browser)
}

/// Last version of `browser` requiring a prefix for the function name.
pub fn last_version_function_prefixed(name: &str, browser: Browser) -> Option<f64> {
    lookup(FUNCTIONS, name, browser)
}

/// Last version of `browser` requiring a prefix for the at-rule name.
pub fn last_version_at_rule_prefixed(name: &str, browser: Browser) -> Option<f64> {
    lookup(AT_RULES, name, browser)
}

/// Last version of `browser` requiring a prefix for the selector name.
pub fn last_version_selector_prefixed(name: &str, browser: Browser) -> Option<f64> {
    lookup(SELECTORS, name, browser)
}
