//! What the server knows about the language: keyword documentation, plus
//! type and property lookups against the standard control registry. Drives
//! hover documentation and completion.

use std::collections::BTreeMap;
use std::rc::Rc;

use ultraviolet_ui::controls::standard_registry;
use ultraviolet_ui::registry::{DependencyProperty, RoutingStrategy, TypeRegistry};
use ultraviolet_ui::style::Easing;
use ultraviolet_ui::value::ValueType;

// ── Keywords ──────────────────────────────────────────────────────────────

pub struct KeywordInfo {
    pub name: &'static str,
    pub doc: &'static str,
    /// Snippet inserted on completion.
    pub snippet: &'static str,
}

/// Keywords valid at the start of a statement inside a rule set.
pub static RULE_SET_KEYWORDS: &[KeywordInfo] = &[
    KeywordInfo {
        name: "trigger",
        doc: "Runs actions while a property condition holds (`trigger property`) or when a routed event reaches the element (`trigger event`).",
        snippet: "trigger ${1|property,event|} $2 {\n\t$0\n}",
    },
    KeywordInfo {
        name: "transition",
        doc: "Plays a storyboard when the element enters a visual state: `transition (Group, State[, From]): storyboard;`.",
        snippet: "transition (${1:CommonStates}, ${2:State}): ${3:storyboard};",
    },
];

/// Keywords valid at document scope.
pub static DOCUMENT_KEYWORDS: &[KeywordInfo] = &[
    KeywordInfo {
        name: "$culture",
        doc: "Sets the culture keyframe and rule values after it are parsed in. The last directive before a value wins; without one, values use the invariant culture.",
        snippet: "\\$culture { ${1:en-US} }",
    },
    KeywordInfo {
        name: "@storyboard",
        doc: "Declares a storyboard: `@name [loop|reverse] { target [Type] [(selector)] { animation Property { keyframe ms [easing] { value } } } }`.",
        snippet: "@${1:name} {\n\ttarget ${2:Type} {\n\t\tanimation ${3:Property} {\n\t\t\tkeyframe 0 { $0 }\n\t\t}\n\t}\n}",
    },
];

/// Keywords only documented on hover.
static OTHER_KEYWORDS: &[(&str, &str)] = &[
    ("property", "`trigger property Name op { value }, ... { actions }`; fires when every condition holds, reverts its `set` actions when one stops holding."),
    ("event", "`trigger event [Owner.]Name [(handled, set-handled)] { actions }`; fires as the routed event passes the element."),
    ("handled", "Lets an event trigger fire for events already marked handled."),
    ("set-handled", "Marks the event handled after the trigger's actions run."),
    ("set", "`set Property [(selector)] { value }`; sets a triggered value on the element or on the elements the selector matches beneath it."),
    ("play-storyboard", "`play-storyboard [(selector)] { name }`; starts a storyboard on the element or on the selected elements."),
    ("play-sfx", "`play-sfx { name }`; queues a sound effect for the host's audio layer."),
    ("target", "`target [Type] [(selector)] { animations }`; the elements a storyboard animates. Without a selector, the element the storyboard plays on."),
    ("animation", "`animation Property [| Navigation as Type] { keyframes }`; animates one property from its current value through the keyframes."),
    ("keyframe", "`keyframe ms [easing] { value }`; a value reached `ms` milliseconds into the storyboard, eased from the previous keyframe."),
    ("loop", "Storyboard loop behavior: restart from the first keyframe after the last."),
    ("reverse", "Storyboard loop behavior: play backwards after the last keyframe, then forwards again."),
    ("important", "`!important` styled and triggered values beat local values."),
];

pub fn keyword_doc(word: &str) -> Option<&'static str> {
    let word = word.trim_start_matches('!');
    RULE_SET_KEYWORDS
        .iter()
        .chain(DOCUMENT_KEYWORDS)
        .find(|k| k.name == word)
        .map(|k| k.doc)
        .or_else(|| OTHER_KEYWORDS.iter().find(|(name, _)| *name == word).map(|(_, doc)| *doc))
}

// ── Easing ────────────────────────────────────────────────────────────────

pub fn easing_names() -> Vec<String> {
    Easing::all().map(|e| e.to_string()).collect()
}

pub fn easing_doc(word: &str) -> Option<String> {
    let easing: Easing = word.parse().ok()?;
    let shape = match easing {
        Easing::Linear => "constant speed",
        Easing::In(_) => "starts slow, ends fast",
        Easing::Out(_) => "starts fast, ends slow",
        Easing::InOut(_) => "slow at both ends",
    };
    Some(format!("**{easing}** · easing\n\nEases the approach to a keyframe: {shape}."))
}

// ── Types ─────────────────────────────────────────────────────────────────

/// Lookups against the control set stylesheets are checked against. Built
/// per request: the registry is not `Send`.
pub struct Knowledge {
    registry: TypeRegistry,
}

impl Knowledge {
    pub fn standard() -> Self {
        Self { registry: standard_registry() }
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registry.type_names().collect();
        names.sort_unstable();
        names
    }

    /// Properties visible on `ty` (its own and inherited), by name.
    pub fn properties(&self, ty: &str) -> BTreeMap<&'static str, Rc<DependencyProperty>> {
        let mut out = BTreeMap::new();
        for descriptor in self.registry.ancestry(ty) {
            for p in descriptor.properties() {
                out.entry(p.name).or_insert_with(|| p.clone());
            }
        }
        out
    }

    /// Attached properties every element accepts, as `Owner.Name`.
    pub fn attached_properties(&self) -> Vec<(String, Rc<DependencyProperty>)> {
        let mut out: Vec<_> = self
            .registry
            .type_names()
            .filter_map(|t| self.registry.get(t))
            .flat_map(|d| d.properties().iter().filter(|p| p.attached))
            .map(|p| (format!("{}.{}", p.owner, p.name), p.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Resolves `Name` on `ty`, or an owner-qualified `Owner.Name`.
    pub fn property(&self, ty: Option<&str>, name: &str) -> Option<Rc<DependencyProperty>> {
        match name.split_once('.') {
            Some((owner, name)) => self.registry.find_property(name, owner),
            None => self.registry.find_property(name, ty?),
        }
    }

    pub fn type_doc(&self, ty: &str) -> Option<String> {
        let descriptor = self.registry.get(ty)?;
        let mut md = format!("**{}**", descriptor.name);
        let bases: Vec<_> = self.registry.ancestry(ty).skip(1).map(|d| d.name).collect();
        if !bases.is_empty() {
            md.push_str(&format!(" : {}", bases.join(" → ")));
        }
        let own: Vec<_> = descriptor.properties().iter().map(|p| format!("`{}`", p.name)).collect();
        if !own.is_empty() {
            md.push_str(&format!("\n\nProperties: {}", own.join(", ")));
        }
        let events: Vec<_> = descriptor
            .events()
            .iter()
            .map(|e| match e.routing {
                RoutingStrategy::Bubble => format!("`{}` (bubbles)", e.name),
                RoutingStrategy::Direct => format!("`{}`", e.name),
            })
            .collect();
        if !events.is_empty() {
            md.push_str(&format!("\n\nEvents: {}", events.join(", ")));
        }
        if let Some(content) = self.registry.content_property(ty) {
            md.push_str(&format!("\n\nContent property: `{content}`"));
        }
        Some(md)
    }

    pub fn property_doc(&self, property: &DependencyProperty) -> String {
        let mut md = format!("**{}.{}** · {}", property.owner, property.name, type_label(property.value_type));
        if property.attached {
            md.push_str(" · attached");
        }
        md.push_str(&format!("\n\nDefault: `{}`", property.default));
        md
    }
}

pub fn type_label(ty: ValueType) -> String {
    match ty {
        ValueType::Bool => "bool (`true` or `false`)".to_string(),
        ValueType::Color => "color (`#rrggbb` or `#rrggbbaa`)".to_string(),
        ValueType::Thickness => "thickness (`all`, `h v`, or `left top right bottom`)".to_string(),
        other => other.to_string(),
    }
}
