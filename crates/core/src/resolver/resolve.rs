//! Strategy evaluation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::types::{CandidateSet, MatchSource, ResolveResult, ResolverOptions};
use crate::parser::slugify;
use crate::vault::dates::{daily_note_id, resolve_date};
use crate::vault::paths::{object_id_to_file_path, validate_within_vault};

/// Raw lookup data loaded from the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverTables {
    /// File-level object IDs.
    pub object_ids: Vec<String>,
    /// `(alias, object_id)`, ordered by object ID.
    pub aliases: Vec<(String, String)>,
    /// `(name_field value, object_id)`.
    pub names: Vec<(String, String)>,
}

type Strategy = fn(&Resolver, &str, &mut CandidateSet);

/// In-memory resolver bound to a snapshot of the index.
#[derive(Debug)]
pub struct Resolver {
    object_ids: HashSet<String>,
    /// Slugged object ID -> object IDs.
    slugged_ids: HashMap<String, Vec<String>>,
    short_names: HashMap<String, Vec<String>>,
    /// Slugged short name -> object IDs.
    slugged_short_names: HashMap<String, Vec<String>>,
    /// Lowercased alias -> object ID. The first object declaring an alias owns it.
    aliases: HashMap<String, String>,
    /// Lowercased name -> object IDs.
    names: HashMap<String, Vec<String>>,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(tables: ResolverTables, options: ResolverOptions) -> Self {
        let mut slugged_ids: HashMap<String, Vec<String>> = HashMap::new();
        let mut short_names: HashMap<String, Vec<String>> = HashMap::new();
        let mut slugged_short_names: HashMap<String, Vec<String>> = HashMap::new();
        for id in &tables.object_ids {
            let short = id.rsplit('/').next().unwrap_or(id);
            short_names.entry(short.to_string()).or_default().push(id.clone());
            slugged_short_names.entry(slug_path(short)).or_default().push(id.clone());
            slugged_ids.entry(slug_path(id)).or_default().push(id.clone());
        }

        let mut aliases = HashMap::new();
        for (alias, id) in tables.aliases {
            aliases.entry(alias.trim().to_lowercase()).or_insert(id);
        }

        let mut names: HashMap<String, Vec<String>> = HashMap::new();
        for (name, id) in tables.names {
            let ids = names.entry(name.trim().to_lowercase()).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Self {
            object_ids: tables.object_ids.into_iter().collect(),
            slugged_ids,
            short_names,
            slugged_short_names,
            aliases,
            names,
            options,
        }
    }

    /// Resolve a reference. Never fails; inspect the result.
    pub fn resolve(&self, reference: &str) -> ResolveResult {
        let normalized = normalize_reference(reference);
        let (base, fragment) = split_fragment(&normalized);
        if base.is_empty() {
            return ResolveResult::default();
        }

        const STRATEGIES: [Strategy; 6] = [
            Resolver::match_literal_path,
            Resolver::match_object_id,
            Resolver::match_short_name,
            Resolver::match_alias,
            Resolver::match_name_field,
            Resolver::match_date,
        ];

        for strategy in STRATEGIES {
            let mut candidates = CandidateSet::default();
            strategy(self, base, &mut candidates);
            if !candidates.is_empty() {
                return finish(candidates, fragment);
            }
        }

        ResolveResult::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Strategies
    // ─────────────────────────────────────────────────────────────────────────

    fn match_literal_path(&self, base: &str, out: &mut CandidateSet) {
        let Some(vault) = self.options.vault_path.as_deref() else {
            return;
        };
        let candidate = format!("{base}.md");
        let Ok(rel) = validate_within_vault(vault, Path::new(&candidate)) else {
            return;
        };
        if vault.join(&rel).is_file() {
            out.insert(base_id(&rel), MatchSource::LiteralPath);
        }
    }

    /// Exact ID. Path-like references also try the slugged form
    /// (`People/Freya` -> `people/freya`) and then any ID ending in
    /// `/<reference>`.
    fn match_object_id(&self, base: &str, out: &mut CandidateSet) {
        if self.object_ids.contains(base) {
            out.insert(base, MatchSource::ObjectId);
            return;
        }
        if !base.contains('/') {
            return;
        }

        let slugged = slug_path(base);
        if let Some(ids) = self.slugged_ids.get(&slugged) {
            for id in ids {
                out.insert(id.clone(), MatchSource::ObjectId);
            }
        }
        if !out.is_empty() {
            return;
        }

        let suffixes = [format!("/{base}"), format!("/{slugged}")];
        let mut hits: Vec<&String> = self
            .object_ids
            .iter()
            .filter(|id| suffixes.iter().any(|s| id.ends_with(s.as_str())))
            .collect();
        hits.sort_unstable();
        for id in hits {
            out.insert(id.clone(), MatchSource::ObjectId);
        }
    }

    /// Exact final segment, then the slugged form (`The Prose Edda` ->
    /// `the-prose-edda`). A reference that differs from its slug only in
    /// letter case is left to the alias and name-field strategies.
    fn match_short_name(&self, base: &str, out: &mut CandidateSet) {
        let ids = self.short_names.get(base).or_else(|| {
            let slugged = slug_path(base);
            let case_only = slugged != base && slugged == base.to_lowercase();
            if case_only { None } else { self.slugged_short_names.get(&slugged) }
        });
        if let Some(ids) = ids {
            for id in ids {
                out.insert(id.clone(), MatchSource::ShortName);
            }
        }
    }

    fn match_alias(&self, base: &str, out: &mut CandidateSet) {
        if let Some(id) = self.aliases.get(&base.to_lowercase()) {
            out.insert(id.clone(), MatchSource::Alias);
        }
    }

    fn match_name_field(&self, base: &str, out: &mut CandidateSet) {
        if let Some(ids) = self.names.get(&base.to_lowercase()) {
            for id in ids {
                out.insert(id.clone(), MatchSource::NameField);
            }
        }
    }

    fn match_date(&self, base: &str, out: &mut CandidateSet) {
        let Some(date) = resolve_date(base, self.options.today) else {
            return;
        };
        let id = daily_note_id(&self.options.daily_directory, date);
        if self.options.allow_missing || self.object_ids.contains(&id) {
            out.insert(id, MatchSource::Date);
        }
    }
}

fn finish(candidates: CandidateSet, fragment: Option<&str>) -> ResolveResult {
    let matches = candidates.into_vec();
    let match_sources = matches.iter().map(|m| (m.object_id.clone(), m.source)).collect();

    if let [only] = matches.as_slice() {
        let file_object_id = only.object_id.clone();
        let target_id = match fragment {
            Some(frag) => format!("{file_object_id}#{frag}"),
            None => file_object_id.clone(),
        };
        return ResolveResult {
            target_id,
            ambiguous: false,
            file_path: object_id_to_file_path(&file_object_id),
            file_object_id,
            is_section: fragment.is_some(),
            matches,
            match_sources,
        };
    }

    ResolveResult { ambiguous: true, matches, match_sources, ..Default::default() }
}

/// Trim, unwrap `[[...]]`, drop display text and normalize separators.
fn normalize_reference(reference: &str) -> String {
    let mut s = reference.trim();
    if let Some(inner) = s.strip_prefix("[[").and_then(|r| r.strip_suffix("]]")) {
        s = inner.trim();
    }
    if let Some((target, _display)) = s.split_once('|') {
        s = target.trim();
    }
    let s = s.replace('\\', "/");
    s.trim_start_matches("./").to_string()
}

/// `file#frag` -> (`file` without `.md`, `Some("frag")`)
fn split_fragment(reference: &str) -> (&str, Option<&str>) {
    let (base, fragment) = match reference.split_once('#') {
        Some((b, f)) if !f.is_empty() => (b, Some(f)),
        Some((b, _)) => (b, None),
        None => (reference, None),
    };
    let base = base.trim_end_matches('/');
    (base.strip_suffix(".md").unwrap_or(base), fragment)
}

/// Slug each path component. Components without letters or digits are kept
/// as they are.
fn slug_path(path: &str) -> String {
    path.split('/')
        .map(|part| {
            if part.chars().any(char::is_alphanumeric) { slugify(part) } else { part.to_string() }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn base_id(rel_path: &str) -> String {
    rel_path.strip_suffix(".md").unwrap_or(rel_path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()
    }

    fn tables() -> ResolverTables {
        ResolverTables {
            object_ids: vec![
                "books/dune".into(),
                "books/the-prose-edda".into(),
                "daily/2026-02-14".into(),
                "people/freya".into(),
                "projects/alpha/notes".into(),
                "projects/beta/notes".into(),
            ],
            aliases: vec![("The Queen".into(), "people/freya".into())],
            names: vec![("Freya".into(), "people/freya".into()), ("Dune".into(), "books/dune".into())],
        }
    }

    fn resolver() -> Resolver {
        Resolver::new(tables(), ResolverOptions::new("daily", today()))
    }

    #[rstest]
    #[case("people/freya", "people/freya", MatchSource::ObjectId)]
    #[case("[[people/freya]]", "people/freya", MatchSource::ObjectId)]
    #[case("people/freya.md", "people/freya", MatchSource::ObjectId)]
    #[case("people\\freya", "people/freya", MatchSource::ObjectId)]
    #[case("freya", "people/freya", MatchSource::ShortName)]
    #[case("the queen", "people/freya", MatchSource::Alias)]
    #[case("Freya", "people/freya", MatchSource::NameField)]
    #[case("today", "daily/2026-02-14", MatchSource::Date)]
    #[case("People/Freya", "people/freya", MatchSource::ObjectId)]
    #[case("[[Books/Dune|the novel]]", "books/dune", MatchSource::ObjectId)]
    #[case("alpha/notes", "projects/alpha/notes", MatchSource::ObjectId)]
    #[case("Alpha/Notes", "projects/alpha/notes", MatchSource::ObjectId)]
    #[case("[[The Prose Edda]]", "books/the-prose-edda", MatchSource::ShortName)]
    #[case("2026-02-14", "daily/2026-02-14", MatchSource::ShortName)]
    fn resolves_by_strategy(
        #[case] reference: &str,
        #[case] expected: &str,
        #[case] source: MatchSource,
    ) {
        let result = resolver().resolve(reference);
        assert!(result.is_found(), "{reference} should resolve");
        assert_eq!(result.target_id, expected);
        assert_eq!(result.match_source(), Some(source));
    }

    #[test]
    fn short_name_collision_is_ambiguous() {
        let result = resolver().resolve("notes");
        assert!(result.ambiguous);
        assert!(!result.is_found());
        assert_eq!(result.target_id, "");
        let ids: Vec<_> = result.matches.iter().map(|m| m.object_id.as_str()).collect();
        assert_eq!(ids, vec!["projects/alpha/notes", "projects/beta/notes"]);
        assert!(result.matches.iter().all(|m| m.source == MatchSource::ShortName));
    }

    #[test]
    fn fragment_is_reattached() {
        let result = resolver().resolve("[[freya#early-life|childhood]]");
        assert_eq!(result.target_id, "people/freya#early-life");
        assert_eq!(result.file_object_id, "people/freya");
        assert_eq!(result.file_path, "people/freya.md");
        assert!(result.is_section);
    }

    #[test]
    fn missing_daily_note_needs_allow_missing() {
        let strict = resolver();
        assert!(!strict.resolve("tomorrow").is_found());

        let lenient =
            Resolver::new(tables(), ResolverOptions::new("daily", today()).allow_missing(true));
        let result = lenient.resolve("tomorrow");
        assert_eq!(result.target_id, "daily/2026-02-15");
        assert_eq!(result.file_path, "daily/2026-02-15.md");
        assert_eq!(result.match_source(), Some(MatchSource::Date));
    }

    #[test]
    fn unknown_and_empty_references_are_not_found() {
        assert_eq!(resolver().resolve("nobody"), ResolveResult::default());
        assert_eq!(resolver().resolve("  "), ResolveResult::default());
        assert_eq!(resolver().resolve("[[]]"), ResolveResult::default());
    }

    #[test]
    fn first_alias_wins() {
        let mut t = tables();
        t.aliases.push(("The Queen".into(), "people/zelda".into()));
        t.object_ids.push("people/zelda".into());
        let result = Resolver::new(t, ResolverOptions::new("daily", today())).resolve("The Queen");
        assert_eq!(result.target_id, "people/freya");
    }

    #[test]
    fn shared_name_field_value_is_ambiguous() {
        let mut t = tables();
        t.object_ids.push("films/dune-1984".into());
        t.names.push(("Dune".into(), "films/dune-1984".into()));
        t.names.push(("Spice Saga".into(), "books/dune".into()));
        t.names.push(("Spice Saga".into(), "films/dune-1984".into()));
        let result =
            Resolver::new(t, ResolverOptions::new("daily", today())).resolve("spice saga");
        assert!(result.ambiguous);
        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.iter().all(|m| m.source == MatchSource::NameField));
    }

    #[test]
    fn literal_file_beats_date_keyword() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("today.md"), "literal\n").unwrap();

        let options = ResolverOptions::new("daily", today())
            .with_vault(dir.path())
            .allow_missing(true);
        let result = Resolver::new(ResolverTables::default(), options).resolve("today");

        assert_eq!(result.target_id, "today");
        assert_eq!(result.match_source(), Some(MatchSource::LiteralPath));
        assert_eq!(result.resolve_path(dir.path()), Some(dir.path().join("today.md")));
    }

    #[test]
    fn literal_path_cannot_escape_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        std::fs::create_dir_all(&vault).unwrap();
        std::fs::write(dir.path().join("secret.md"), "x\n").unwrap();

        let options = ResolverOptions::new("daily", today()).with_vault(&vault);
        let result = Resolver::new(ResolverTables::default(), options).resolve("../secret");
        assert!(!result.is_found());
    }

    #[test]
    fn into_unique_maps_errors() {
        let err = resolver().resolve("notes").into_unique("notes").unwrap_err();
        assert!(err.to_string().contains("projects/alpha/notes (short_name)"));

        let err = resolver().resolve("nobody").into_unique("nobody").unwrap_err();
        assert_eq!(err, crate::resolver::ResolveError::NotFound("nobody".into()));
    }
}
