//! The vendor-prefix rewriting plugin.
//!
//! Driven by a [`SupportMatrix`]: for every prefixable unit the plugin
//! computes which prefixes the declared browsers still require, then adds
//! missing prefixed equivalents, optionally moves present ones into
//! canonical position (`rearrange`), and optionally removes ones no
//! declared browser needs (`prune`).
//!
//! Declarations are handled while streaming (their sibling collection is
//! complete by the time they are delivered). Selector and at-rule
//! equivalents can appear later in the document, so those units are
//! recorded during delivery and handled once parsing finishes.

use crate::ast::{NodeData, PropertyName, UnitKind};
use crate::data::prefixes;
use crate::data::{Browser, Prefix, SupportMatrix};
use crate::plugin::{AutoRefine, Plugin, PluginContext, Registrar, Requirement, Subscriptions};
use crate::tree::{NodeId, Slot, SyntaxTree};

/// The vendor-prefixer.
///
/// ```no_run
/// use horizon_cascade::data::Browser;
/// use horizon_cascade::plugin::Prefixer;
///
/// let mut prefixer = Prefixer::custom_browser_support();
/// prefixer.support().browser(Browser::Firefox, 25);
/// prefixer.prune(true);
/// ```
#[derive(Debug, Default)]
pub struct Prefixer {
    support: SupportMatrix,
    rearrange: bool,
    prune: bool,
    pending_selectors: Vec<NodeId>,
    pending_at_rules: Vec<NodeId>,
    sealed: bool,
}

impl Prefixer {
    /// A prefixer with an empty support matrix; declare browsers on
    /// [`Prefixer::support`].
    pub fn custom_browser_support() -> Self {
        Self::default()
    }

    /// A prefixer supporting the latest known version of every browser.
    pub fn default_browser_support() -> Self {
        let mut prefixer = Self::default();
        for browser in [
            Browser::Chrome,
            Browser::Firefox,
            Browser::Safari,
            Browser::IosSafari,
            Browser::Android,
            Browser::Ie,
            Browser::Edge,
            Browser::Opera,
        ] {
            prefixer.support.latest(browser);
        }
        prefixer
    }

    /// The support matrix driving prefix decisions.
    pub fn support(&mut self) -> &mut SupportMatrix {
        &mut self.support
    }

    /// Whether present-but-misplaced prefixed equivalents are moved before
    /// their unprefixed counterpart. Off by default.
    pub fn rearrange(&mut self, rearrange: bool) -> &mut Self {
        self.rearrange = rearrange;
        self
    }

    /// Whether prefixed equivalents no declared browser requires are
    /// removed. Off by default.
    pub fn prune(&mut self, prune: bool) -> &mut Self {
        self.prune = prune;
        self
    }

    fn handle_pseudo_element(&self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let tree = cx.tree();
        let name = match tree.data(unit) {
            NodeData::PseudoElementSelector { name } => name.clone(),
            _ => return,
        };
        let Some(selector) = tree.parent(unit) else { return };
        let Some(rule) = tree.parent(selector) else { return };
        if tree.parent(rule).is_none() {
            return;
        }

        match Prefix::split(&name) {
            Some((prefix, base)) => {
                if !prefixes::is_prefixable_selector(base) {
                    return;
                }
                let required = self
                    .support
                    .required_prefixes(base, prefixes::last_version_selector_prefixed);
                let unprefixed = find_sibling_rule_with_pseudo(tree, rule, base);
                if !required.contains(&prefix) && self.prune {
                    cx.detach(rule);
                } else if self.rearrange {
                    if let Some(target) = unprefixed {
                        if target != rule {
                            cx.tree_mut().insert_before(target, rule);
                        }
                    }
                }
            }
            None => {
                if !prefixes::is_prefixable_selector(&name) {
                    return;
                }
                let required = self
                    .support
                    .required_prefixes(&name, prefixes::last_version_selector_prefixed);
                for prefix in required {
                    let prefixed = format!("{}{}", prefix.symbol(), name);
                    if find_sibling_rule_with_pseudo(cx.tree(), rule, &prefixed).is_some() {
                        continue;
                    }
                    let copy = cx.tree_mut().deep_copy(rule);
                    rename_pseudo_elements(cx.tree_mut(), copy, &name, &prefixed);
                    cx.insert_before(rule, copy);
                }
            }
        }
    }

    fn handle_at_rule(&self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let tree = cx.tree();
        let (name, expression) = match tree.data(unit) {
            NodeData::AtRule(d) => (
                d.name.clone(),
                d.raw_expression.as_ref().map(|raw| raw.content.clone()),
            ),
            _ => return,
        };
        if tree.parent(unit).is_none() {
            return;
        }

        match Prefix::split(&name) {
            Some((prefix, base)) => {
                if !prefixes::is_prefixable_at_rule(base) {
                    return;
                }
                let required = self
                    .support
                    .required_prefixes(base, prefixes::last_version_at_rule_prefixed);
                let unprefixed = find_sibling_at_rule(tree, unit, base, expression.as_deref());
                if !required.contains(&prefix) && self.prune {
                    cx.detach(unit);
                } else if self.rearrange {
                    if let Some(target) = unprefixed {
                        if target != unit {
                            cx.tree_mut().insert_before(target, unit);
                        }
                    }
                }
            }
            None => {
                if !prefixes::is_prefixable_at_rule(&name) {
                    return;
                }
                let required = self
                    .support
                    .required_prefixes(&name, prefixes::last_version_at_rule_prefixed);
                for prefix in required {
                    let prefixed = format!("{}{}", prefix.symbol(), name);
                    if find_sibling_at_rule(cx.tree(), unit, &prefixed, expression.as_deref())
                        .is_some()
                    {
                        continue;
                    }
                    let copy = cx.tree_mut().deep_copy(unit);
                    if let NodeData::AtRule(d) = cx.tree_mut().data_mut(copy) {
                        d.name = prefixed;
                    }
                    cx.insert_before(unit, copy);
                }
            }
        }
    }

    fn handle_declaration(&self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let tree = cx.tree();
        if tree.parent(unit).is_none() {
            return;
        }
        let name = match tree.data(unit) {
            NodeData::Declaration(d) => match &d.name {
                Some(name) => name.clone(),
                None => return,
            },
            _ => return,
        };

        match name.prefix {
            Some(prefix) => {
                if !prefixes::is_prefixable_property(&name.name) {
                    return;
                }
                let required = self
                    .support
                    .required_prefixes(&name.name, prefixes::last_version_property_prefixed);
                let unprefixed = find_sibling_declaration(tree, unit, &name.name, None);
                if !required.contains(&prefix) && self.prune {
                    cx.detach(unit);
                } else if self.rearrange {
                    if let Some(target) = unprefixed {
                        if target != unit {
                            cx.tree_mut().insert_before(target, unit);
                        }
                    }
                }
            }
            None => {
                if prefixes::is_prefixable_property(&name.name) {
                    let required = self
                        .support
                        .required_prefixes(&name.name, prefixes::last_version_property_prefixed);
                    for prefix in required {
                        if find_sibling_declaration(cx.tree(), unit, &name.name, Some(prefix))
                            .is_some()
                        {
                            continue;
                        }
                        let copy = cx.tree_mut().deep_copy(unit);
                        if let NodeData::Declaration(d) = cx.tree_mut().data_mut(copy) {
                            if let Some(copied) = &mut d.name {
                                copied.prefix = Some(prefix);
                            }
                        }
                        cx.insert_before(unit, copy);
                    }
                }

                for function in prefixable_functions(cx.tree(), unit) {
                    let required = self
                        .support
                        .required_prefixes(&function, prefixes::last_version_function_prefixed);
                    for prefix in required {
                        let prefixed = format!("{}{}", prefix.symbol(), function);
                        if sibling_has_function(cx.tree(), unit, &name, &prefixed) {
                            continue;
                        }
                        let copy = cx.tree_mut().deep_copy(unit);
                        rename_functions(cx.tree_mut(), copy, &function, &prefixed);
                        cx.insert_before(unit, copy);
                    }
                }
            }
        }
    }
}

impl Plugin for Prefixer {
    fn register(&mut self, registrar: &mut Registrar<'_>) {
        registrar.require_with(AutoRefine::all);
    }

    fn subscriptions(&self, subscriptions: &mut Subscriptions) {
        subscriptions
            .rework(UnitKind::PseudoElementSelector)
            .rework_when(UnitKind::Declaration, Requirement::RefinedDeclaration)
            .rework(UnitKind::AtRule);
    }

    fn rework(&mut self, unit: NodeId, cx: &mut PluginContext<'_>) {
        match cx.tree().kind(unit) {
            UnitKind::PseudoElementSelector if !self.sealed => self.pending_selectors.push(unit),
            UnitKind::AtRule if !self.sealed => self.pending_at_rules.push(unit),
            UnitKind::Declaration => self.handle_declaration(unit, cx),
            _ => {}
        }
    }

    fn after_pre_process(&mut self, cx: &mut PluginContext<'_>) {
        self.sealed = true;
        for unit in std::mem::take(&mut self.pending_selectors) {
            self.handle_pseudo_element(unit, cx);
        }
        for unit in std::mem::take(&mut self.pending_at_rules) {
            self.handle_at_rule(unit, cx);
        }
    }
}

/// The property name of a declaration, refined or derived from its raw
/// fragment (later siblings may not have been refined yet).
fn declaration_property(tree: &SyntaxTree, declaration: NodeId) -> Option<PropertyName> {
    match tree.data(declaration) {
        NodeData::Declaration(d) => match (&d.name, &d.raw_name) {
            (Some(name), _) => Some(name.clone()),
            (None, Some(raw)) => Some(PropertyName::from_raw(raw)),
            _ => None,
        },
        _ => None,
    }
}

/// Finds a sibling declaration with the given unprefixed name and prefix.
fn find_sibling_declaration(
    tree: &SyntaxTree,
    declaration: NodeId,
    base: &str,
    prefix: Option<Prefix>,
) -> Option<NodeId> {
    let link = tree.parent_link(declaration)?;
    tree.children(link.owner, link.slot).find(|sibling| {
        if *sibling == declaration {
            return false;
        }
        match declaration_property(tree, *sibling) {
            Some(name) => name.prefix == prefix && name.name.eq_ignore_ascii_case(base),
            None => false,
        }
    })
}

/// True if any selector of the rule contains a pseudo element of the given
/// name.
fn rule_has_pseudo_element(tree: &SyntaxTree, rule: NodeId, pseudo: &str) -> bool {
    if !matches!(tree.data(rule), NodeData::Rule(_)) {
        return false;
    }
    tree.children(rule, Slot::Selectors).any(|selector| {
        tree.children(selector, Slot::Parts).any(|part| match tree.data(part) {
            NodeData::PseudoElementSelector { name } => name.eq_ignore_ascii_case(pseudo),
            _ => false,
        })
    })
}

/// Finds a sibling statement that is a rule containing the given pseudo
/// element.
fn find_sibling_rule_with_pseudo(
    tree: &SyntaxTree,
    rule: NodeId,
    pseudo: &str,
) -> Option<NodeId> {
    let link = tree.parent_link(rule)?;
    tree.children(link.owner, link.slot)
        .find(|statement| *statement != rule && rule_has_pseudo_element(tree, *statement, pseudo))
}

/// Finds a sibling at-rule with the given name and an equal expression.
fn find_sibling_at_rule(
    tree: &SyntaxTree,
    at_rule: NodeId,
    name: &str,
    expression: Option<&str>,
) -> Option<NodeId> {
    let link = tree.parent_link(at_rule)?;
    tree.children(link.owner, link.slot).find(|statement| {
        if *statement == at_rule {
            return false;
        }
        match tree.data(*statement) {
            NodeData::AtRule(d) => {
                d.name.eq_ignore_ascii_case(name)
                    && d.raw_expression.as_ref().map(|raw| raw.content.as_str()) == expression
            }
            _ => false,
        }
    })
}

/// Renames every matching pseudo element within a rule's selectors.
fn rename_pseudo_elements(tree: &mut SyntaxTree, rule: NodeId, from: &str, to: &str) {
    for selector in tree.child_ids(rule, Slot::Selectors) {
        for part in tree.child_ids(selector, Slot::Parts) {
            if let NodeData::PseudoElementSelector { name } = tree.data_mut(part) {
                if name.eq_ignore_ascii_case(from) {
                    *name = to.to_string();
                }
            }
        }
    }
}

/// The prefixable function names appearing in a refined declaration value,
/// in order, deduplicated.
fn prefixable_functions(tree: &SyntaxTree, declaration: NodeId) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let Some(value) = tree.declaration_value(declaration) else { return names };
    if !matches!(tree.data(value), NodeData::PropertyValue(_)) {
        return names;
    }
    for member in tree.children(value, Slot::Members) {
        if let NodeData::FunctionValue { name, .. } = tree.data(member) {
            if prefixes::is_prefixable_function(name)
                && !names.iter().any(|n| n.eq_ignore_ascii_case(name))
            {
                names.push(name.clone());
            }
        }
    }
    names
}

/// True if a sibling declaration of the same property already carries the
/// prefixed function.
fn sibling_has_function(
    tree: &SyntaxTree,
    declaration: NodeId,
    property: &PropertyName,
    function: &str,
) -> bool {
    let Some(link) = tree.parent_link(declaration) else { return false };
    tree.children(link.owner, link.slot).any(|sibling| {
        if sibling == declaration {
            return false;
        }
        let same_property = match declaration_property(tree, sibling) {
            Some(name) => name.name.eq_ignore_ascii_case(&property.name),
            None => false,
        };
        if !same_property {
            return false;
        }
        match tree.data(sibling) {
            NodeData::Declaration(d) => {
                if let Some(value) = d.value {
                    if matches!(tree.data(value), NodeData::PropertyValue(_)) {
                        return tree.children(value, Slot::Members).any(|member| {
                            matches!(tree.data(member), NodeData::FunctionValue { name, .. }
                                if name.eq_ignore_ascii_case(function))
                        });
                    }
                }
                match &d.raw_value {
                    Some(raw) => raw.content.contains(function),
                    None => false,
                }
            }
            _ => false,
        }
    })
}

/// Renames every matching function within a declaration's refined value.
fn rename_functions(tree: &mut SyntaxTree, declaration: NodeId, from: &str, to: &str) {
    let Some(value) = tree.declaration_value(declaration) else { return };
    if !matches!(tree.data(value), NodeData::PropertyValue(_)) {
        return;
    }
    for member in tree.child_ids(value, Slot::Members) {
        if let NodeData::FunctionValue { name, .. } = tree.data_mut(member) {
            if name.eq_ignore_ascii_case(from) {
                *name = to.to_string();
            }
        }
    }
}
