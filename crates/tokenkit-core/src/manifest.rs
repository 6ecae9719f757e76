/// Manifest parsing and permutation enumeration.
///
/// A manifest names the base file sets, the modifiers (theme axes), and
/// optionally a `generate` list restricting which combinations to build.
/// Enumeration is fully deterministic:
///
/// - modifiers contribute in manifest declaration order;
/// - `oneOf` choices follow the declared option order;
/// - `anyOf` subsets are enumerated in binary-counting order — subsets by
///   increasing bitmask where bit *i* is declared option *i*, so the empty
///   subset comes first, then `{o1}`, `{o2}`, `{o1,o2}`, …
///
/// The ordered file list of a permutation is a pure function of the
/// manifest and the selections.
use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// A parsed manifest document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    /// Ordered base file sets, merged before any modifier files.
    pub sets: Vec<SetEntry>,
    /// Modifier definitions; declaration order is semantic.
    #[serde(default)]
    pub modifiers: IndexMap<String, Modifier>,
    /// Optional restriction to specific combinations.
    #[serde(default)]
    pub generate: Option<Vec<GenerateSpec>>,
}

/// One base set: an ordered list of contributing file paths.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetEntry {
    /// File paths, relative to the manifest's directory.
    pub values: Vec<String>,
}

/// A modifier: an exclusive choice (`oneOf`) or a free subset (`anyOf`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Modifier {
    /// Exactly one option is selected.
    OneOf {
        /// Declared options, in order.
        #[serde(rename = "oneOf")]
        one_of: Vec<String>,
        /// Files contributed by each option.
        values: IndexMap<String, Vec<String>>,
    },
    /// Any subset of options (including none) is selected.
    AnyOf {
        /// Declared options, in order.
        #[serde(rename = "anyOf")]
        any_of: Vec<String>,
        /// Files contributed by each option.
        values: IndexMap<String, Vec<String>>,
    },
}

impl Modifier {
    /// The declared options, in declaration order.
    pub fn options(&self) -> &[String] {
        match self {
            Self::OneOf { one_of, .. } => one_of,
            Self::AnyOf { any_of, .. } => any_of,
        }
    }

    /// The files contributed by `option` (empty when the option declares none).
    pub fn files_for(&self, option: &str) -> &[String] {
        let values = match self {
            Self::OneOf { values, .. } | Self::AnyOf { values, .. } => values,
        };
        values.get(option).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` for an `anyOf` modifier.
    pub fn is_any_of(&self) -> bool {
        matches!(self, Self::AnyOf { .. })
    }

    /// Enumerates every subset of an `anyOf` modifier in binary-counting
    /// order (empty subset first). A `oneOf` modifier yields its options as
    /// singleton selections instead.
    pub fn choices(&self) -> Vec<Selection> {
        match self {
            Self::OneOf { one_of, .. } => one_of
                .iter()
                .map(|o| Selection::One(o.clone()))
                .collect(),
            Self::AnyOf { any_of, .. } => {
                let n = any_of.len().min(MAX_ANY_OF_OPTIONS);
                let mut out = Vec::with_capacity(1 << n);
                for mask in 0u64..(1u64 << n) {
                    let subset: Vec<String> = any_of
                        .iter()
                        .take(n)
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, o)| o.clone())
                        .collect();
                    out.push(Selection::Many(subset));
                }
                out
            }
        }
    }
}

/// Power-set enumeration guard; 2^16 permutations per modifier is already
/// far past any sane manifest.
const MAX_ANY_OF_OPTIONS: usize = 16;

/// One entry in the `generate` list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateSpec {
    /// Explicit output path for the produced document.
    pub output: Option<String>,
    /// `"name"` (fan out across options) or `"name:value"` (pin) entries.
    pub include_modifiers: Vec<String>,
    /// Direct modifier selections keyed by modifier name.
    pub selections: IndexMap<String, GenerateSelection>,
}

/// The selection a generate spec makes for one modifier.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateSelection {
    /// A single option name.
    One(String),
    /// An explicit subset (meaningful for `anyOf`; fans out for `oneOf`).
    Many(Vec<String>),
    /// `"*"`: all options.
    Wildcard,
}

impl<'de> Deserialize<'de> for GenerateSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SelectionVisitor;

        impl<'de> Visitor<'de> for SelectionVisitor {
            type Value = GenerateSelection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an option name, an array of option names, or \"*\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<GenerateSelection, E> {
                if v == "*" {
                    Ok(GenerateSelection::Wildcard)
                } else {
                    Ok(GenerateSelection::One(v.to_owned()))
                }
            }

            fn visit_seq<A: de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<GenerateSelection, A::Error> {
                let mut options = Vec::new();
                while let Some(opt) = seq.next_element::<String>()? {
                    options.push(opt);
                }
                Ok(GenerateSelection::Many(options))
            }
        }

        deserializer.deserialize_any(SelectionVisitor)
    }
}

impl<'de> Deserialize<'de> for GenerateSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = GenerateSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a generate spec object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<GenerateSpec, A::Error> {
                let mut spec = GenerateSpec::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "output" => {
                            spec.output = Some(map.next_value::<String>()?);
                        }
                        "includeModifiers" => {
                            spec.include_modifiers = map.next_value::<Vec<String>>()?;
                        }
                        _ => {
                            let selection = map.next_value::<GenerateSelection>()?;
                            spec.selections.insert(key, selection);
                        }
                    }
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Manifest shape violations found after JSON decoding succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// `sets` is present but empty.
    EmptySets,
    /// A `oneOf` modifier declares an empty option list, leaving nothing to
    /// select. (A zero-option `anyOf` is fine: its power set is the single
    /// empty subset.)
    EmptyModifier {
        /// The modifier name.
        modifier: String,
    },
    /// A `values` entry names an option that was never declared.
    UndeclaredValuesEntry {
        /// The modifier name.
        modifier: String,
        /// The stray option name.
        option: String,
    },
    /// A generate spec references a modifier the manifest does not define.
    UnknownModifier {
        /// The referenced name.
        name: String,
    },
    /// A generate spec selects an option a modifier does not declare.
    UnknownOption {
        /// The modifier name.
        modifier: String,
        /// The unknown option.
        option: String,
    },
    /// An `includeModifiers` entry is not `name` or `name:value`.
    MalformedIncludeModifier {
        /// The raw entry.
        entry: String,
    },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySets => f.write_str("manifest `sets` must name at least one set"),
            Self::EmptyModifier { modifier } => {
                write!(f, "oneOf modifier {modifier:?} declares no options")
            }
            Self::UndeclaredValuesEntry { modifier, option } => write!(
                f,
                "modifier {modifier:?} has a values entry for undeclared option {option:?}"
            ),
            Self::UnknownModifier { name } => {
                write!(f, "generate spec references unknown modifier {name:?}")
            }
            Self::UnknownOption { modifier, option } => write!(
                f,
                "generate spec selects unknown option {option:?} of modifier {modifier:?}"
            ),
            Self::MalformedIncludeModifier { entry } => write!(
                f,
                "includeModifiers entry {entry:?} is not `name` or `name:value`"
            ),
        }
    }
}

impl std::error::Error for ManifestError {}

// ---------------------------------------------------------------------------
// Semantic validation
// ---------------------------------------------------------------------------

impl Manifest {
    /// Checks the manifest beyond its serde shape: non-empty sets, coherent
    /// modifier option/values tables, and generate specs that only name
    /// declared modifiers and options.
    ///
    /// # Errors
    ///
    /// Returns the first [`ManifestError`] found.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.sets.is_empty() {
            return Err(ManifestError::EmptySets);
        }

        for (name, modifier) in &self.modifiers {
            if modifier.options().is_empty() && !modifier.is_any_of() {
                return Err(ManifestError::EmptyModifier {
                    modifier: name.clone(),
                });
            }
            let values = match modifier {
                Modifier::OneOf { values, .. } | Modifier::AnyOf { values, .. } => values,
            };
            for option in values.keys() {
                if !modifier.options().contains(option) {
                    return Err(ManifestError::UndeclaredValuesEntry {
                        modifier: name.clone(),
                        option: option.clone(),
                    });
                }
            }
        }

        if let Some(specs) = &self.generate {
            for spec in specs {
                self.validate_generate_spec(spec)?;
            }
        }

        Ok(())
    }

    fn validate_generate_spec(&self, spec: &GenerateSpec) -> Result<(), ManifestError> {
        for (name, selection) in &spec.selections {
            let Some(modifier) = self.modifiers.get(name) else {
                return Err(ManifestError::UnknownModifier { name: name.clone() });
            };
            match selection {
                GenerateSelection::One(option) => {
                    if !modifier.options().contains(option) {
                        return Err(ManifestError::UnknownOption {
                            modifier: name.clone(),
                            option: option.clone(),
                        });
                    }
                }
                GenerateSelection::Many(options) => {
                    for option in options {
                        if !modifier.options().contains(option) {
                            return Err(ManifestError::UnknownOption {
                                modifier: name.clone(),
                                option: option.clone(),
                            });
                        }
                    }
                }
                GenerateSelection::Wildcard => {}
            }
        }
        for entry in &spec.include_modifiers {
            let (name, option) = match entry.split_once(':') {
                Some((n, o)) => (n, Some(o)),
                None => (entry.as_str(), None),
            };
            if name.is_empty() {
                return Err(ManifestError::MalformedIncludeModifier {
                    entry: entry.clone(),
                });
            }
            let Some(modifier) = self.modifiers.get(name) else {
                return Err(ManifestError::UnknownModifier {
                    name: name.to_owned(),
                });
            };
            if let Some(option) = option {
                if !modifier.options().contains(&option.to_owned()) {
                    return Err(ManifestError::UnknownOption {
                        modifier: name.to_owned(),
                        option: option.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    /// All base-set files in declared order.
    pub fn base_files(&self) -> Vec<String> {
        self.sets
            .iter()
            .flat_map(|s| s.values.iter().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Permutations
// ---------------------------------------------------------------------------

/// The value chosen for one modifier within a permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A `oneOf` pick.
    One(String),
    /// An `anyOf` subset, in declared option order (possibly empty).
    Many(Vec<String>),
}

impl Selection {
    /// The id fragment for this selection: the option name, `+`-joined
    /// subset members, or `default` for the empty subset.
    pub fn id_fragment(&self) -> String {
        match self {
            Self::One(option) => option.clone(),
            Self::Many(options) => {
                if options.is_empty() {
                    "default".to_owned()
                } else {
                    options.join("+")
                }
            }
        }
    }
}

/// One enumerated combination of modifier values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// The synthesized or explicit identifier (`theme-light_features-shadows+type`).
    pub id: String,
    /// Selected value per modifier, in manifest declaration order.
    pub selections: IndexMap<String, Selection>,
    /// The ordered input file list: base sets, then modifier files.
    pub files: Vec<String>,
    /// Explicit output path from a generate spec, when one applies.
    pub output: Option<String>,
}

impl Permutation {
    /// The output file name: the explicit `output`, else `<id>.json`.
    pub fn output_name(&self) -> String {
        match &self.output {
            Some(path) => path.clone(),
            None => format!("{}.json", self.id),
        }
    }
}

/// Enumerates every permutation of `manifest`, in a deterministic order.
///
/// Without a `generate` list this is the full cartesian product; with one,
/// only the requested combinations are produced, in spec order.
///
/// # Errors
///
/// Returns [`ManifestError`] when the manifest fails [`Manifest::validate`].
pub fn enumerate(manifest: &Manifest) -> Result<Vec<Permutation>, ManifestError> {
    manifest.validate()?;

    let specs: Vec<GenerateSpec> = match &manifest.generate {
        Some(specs) => specs.clone(),
        None => vec![GenerateSpec {
            // No generate list: one implicit spec that fans out across
            // every modifier.
            include_modifiers: manifest.modifiers.keys().cloned().collect(),
            ..GenerateSpec::default()
        }],
    };

    let mut permutations = Vec::new();
    for spec in &specs {
        let mut axis_choices: Vec<(String, Vec<Selection>)> = Vec::new();
        for (name, modifier) in &manifest.modifiers {
            axis_choices.push((name.clone(), spec_choices(spec, name, modifier)));
        }

        let combos = cartesian(&axis_choices);
        let single = combos.len() == 1;
        for selections in combos {
            let id = synthesize_id(&selections);
            let files = collect_files(manifest, &selections);
            // An explicit output name only makes sense when the spec pins a
            // single combination; fanouts fall back to synthesized ids.
            let output = if single { spec.output.clone() } else { None };
            permutations.push(Permutation {
                id,
                selections,
                files,
                output,
            });
        }
    }

    Ok(permutations)
}

/// The choice list one generate spec induces for one modifier.
fn spec_choices(spec: &GenerateSpec, name: &str, modifier: &Modifier) -> Vec<Selection> {
    if let Some(selection) = spec.selections.get(name) {
        return match (selection, modifier.is_any_of()) {
            (GenerateSelection::One(option), false) => vec![Selection::One(option.clone())],
            (GenerateSelection::One(option), true) => {
                vec![Selection::Many(vec![option.clone()])]
            }
            (GenerateSelection::Many(options), false) => options
                .iter()
                .map(|o| Selection::One(o.clone()))
                .collect(),
            (GenerateSelection::Many(options), true) => {
                // Keep declared option order regardless of spelling order.
                let subset: Vec<String> = modifier
                    .options()
                    .iter()
                    .filter(|o| options.contains(o))
                    .cloned()
                    .collect();
                vec![Selection::Many(subset)]
            }
            (GenerateSelection::Wildcard, false) => modifier
                .options()
                .iter()
                .map(|o| Selection::One(o.clone()))
                .collect(),
            (GenerateSelection::Wildcard, true) => {
                vec![Selection::Many(modifier.options().to_vec())]
            }
        };
    }

    for entry in &spec.include_modifiers {
        match entry.split_once(':') {
            Some((n, option)) if n == name => {
                return if modifier.is_any_of() {
                    vec![Selection::Many(vec![option.to_owned()])]
                } else {
                    vec![Selection::One(option.to_owned())]
                };
            }
            Some(_) => {}
            None if entry == name => {
                // Bare name: fan out across the modifier's full choice space.
                return modifier.choices();
            }
            None => {}
        }
    }

    // Unmentioned modifier: first option for oneOf, empty subset for anyOf.
    if modifier.is_any_of() {
        vec![Selection::Many(Vec::new())]
    } else {
        modifier
            .options()
            .first()
            .map(|o| vec![Selection::One(o.clone())])
            .unwrap_or_default()
    }
}

/// Cartesian product over per-modifier choice lists. The last modifier
/// varies fastest, so the first modifier groups the output.
fn cartesian(axes: &[(String, Vec<Selection>)]) -> Vec<IndexMap<String, Selection>> {
    let mut combos: Vec<IndexMap<String, Selection>> = vec![IndexMap::new()];
    for (name, choices) in axes {
        let mut next = Vec::with_capacity(combos.len() * choices.len().max(1));
        for combo in &combos {
            for choice in choices {
                let mut extended = combo.clone();
                extended.insert(name.clone(), choice.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

/// Synthesizes the permutation id: `modifier-fragment` pairs joined by `_`.
fn synthesize_id(selections: &IndexMap<String, Selection>) -> String {
    if selections.is_empty() {
        return "default".to_owned();
    }
    selections
        .iter()
        .map(|(name, sel)| format!("{name}-{}", sel.id_fragment()))
        .collect::<Vec<_>>()
        .join("_")
}

/// The ordered file list for a set of selections: base files first,
/// then each modifier's files in manifest order; within an `anyOf`
/// selection, option files in declared option order.
fn collect_files(manifest: &Manifest, selections: &IndexMap<String, Selection>) -> Vec<String> {
    let mut files = manifest.base_files();
    for (name, selection) in selections {
        let Some(modifier) = manifest.modifiers.get(name) else {
            continue;
        };
        match selection {
            Selection::One(option) => {
                files.extend(modifier.files_for(option).iter().cloned());
            }
            Selection::Many(subset) => {
                for option in modifier.options() {
                    if subset.contains(option) {
                        files.extend(modifier.files_for(option).iter().cloned());
                    }
                }
            }
        }
    }
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
