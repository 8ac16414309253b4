//! Workflow plans previewed and applied against a real vault.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use quire_core::config::VaultConfig;
use quire_core::index::{IndexDb, ReindexOptions, Reindexer};
use quire_core::mutation::MutationContext;
use quire_core::schema::Schema;
use quire_core::workflow::{WorkflowError, apply_plan, parse_plan, preview_plan};
use tempfile::TempDir;

const SCHEMA: &str = "types:\n  person:\n    name_field: name\ntraits:\n  task:\n    type: enum\n    values: [todo, done]\n";

struct Vault {
    dir: TempDir,
    db: IndexDb,
    config: VaultConfig,
    schema: Schema,
}

impl Vault {
    fn new(config: VaultConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let files = [
            ("people/freya.md", "---\ntype: person\nname: Freya\n---\n# Freya\n\n## Early life\n\nBorn north.\n"),
            ("inbox.md", "Met [[freya]] today, see [[people/freya#early-life|bio]].\nTODO twice\nTODO twice\n"),
            ("daily/2026-02-13.md", "---\ntype: date\n---\n# Friday\n\n- @task(todo) buy milk\n- @task(todo) call mum\n"),
            ("templates/person.md", "# Template\n"),
        ];
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let db = IndexDb::open_in_memory().unwrap();
        let schema = Schema::from_yaml(SCHEMA).unwrap();
        Reindexer::new(&db, dir.path(), &config, &schema)
            .run(&ReindexOptions::default())
            .unwrap();
        Self { dir, db, config, schema }
    }

    fn ctx(&self) -> MutationContext<'_> {
        MutationContext {
            db: &self.db,
            vault_root: self.dir.path(),
            config: &self.config,
            schema: &self.schema,
            today: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

fn protected_templates() -> VaultConfig {
    VaultConfig { protected_prefixes: vec!["templates/".into()], ..Default::default() }
}

#[test]
fn invalid_op_blocks_whole_plan() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"plan_version":1,"workflow":"triage","ops":[
            {"op":"add","why":"log","args":{"to":"inbox","text":"first"}},
            {"op":"edit","why":"fix","args":{"path":"inbox.md","old_str":"TODO twice","new_str":"done"}}
        ]}"#,
    )
    .unwrap();
    let before = vault.read("inbox.md");

    let err = apply_plan(&vault.ctx(), &plan, true).unwrap_err();
    match &err {
        WorkflowError::Validation { index, op, reason } => {
            assert_eq!(*index, 1);
            assert_eq!(op, "edit");
            assert_eq!(reason, "old_str must match exactly once (matches=2)");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_rejection());
    assert_eq!(vault.read("inbox.md"), before);
}

#[test]
fn preview_writes_nothing() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r###"{"plan_version":1,"ops":[
            {"op":"add","why":"log","args":{"to":"today","text":"standup","heading":"## Log"}},
            {"op":"set","why":"tag","args":{"object_id":"Freya","fields":{"status":"active","rating":5}}},
            {"op":"update_trait","why":"done","args":{"trait_id":"daily/2026-02-13.md:trait:0","value":"done"}},
            {"op":"move","why":"tidy","args":{"source":"freya","destination":"people/friends/freya"}}
        ]}"###,
    )
    .unwrap();

    let summaries = preview_plan(&vault.ctx(), &plan).unwrap();
    let lines: Vec<_> = summaries.iter().map(|s| s.summary.as_str()).collect();
    assert_eq!(
        lines,
        [
            "append to daily/2026-02-14 under heading \"## Log\" (creates daily note)",
            "set 2 field(s) on people/freya",
            "update daily/2026-02-13.md:trait:0 -> done",
            "move people/freya -> people/friends/freya (updates links in 1 file(s))",
        ]
    );

    let outcome = apply_plan(&vault.ctx(), &plan, false).unwrap();
    assert!(outcome.ok);
    assert!(!outcome.confirm);
    assert!(outcome.applied.is_empty());
    assert!(!vault.root().join("daily/2026-02-14.md").exists());
    assert!(vault.root().join("people/freya.md").exists());
}

#[test]
fn confirmed_plan_applies_in_order() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"outputs":{"plan":{"plan_version":1,"workflow":"weekly","ops":[
            {"op":"add","why":"log","args":{"to":"today","text":"standup"}},
            {"op":"set","why":"tag","args":{"object_id":"Freya","fields":{"status":"active"}}},
            {"op":"update_trait","why":"done","args":{"trait_id":"daily/2026-02-13.md:trait:1","value":"done"}},
            {"op":"move","why":"tidy","args":{"source":"people/freya","destination":"people/friends/freya.md"}},
            {"op":"edit","why":"fix","args":{"path":"daily/2026-02-13.md","old_str":"buy milk","new_str":"buy oat milk"}}
        ]}}}"#,
    )
    .unwrap();

    let outcome = apply_plan(&vault.ctx(), &plan, true).unwrap();
    assert!(outcome.ok && outcome.confirm);
    assert_eq!(outcome.workflow.as_deref(), Some("weekly"));
    assert_eq!(outcome.applied.len(), 5);

    let daily = vault.read("daily/2026-02-14.md");
    assert!(daily.starts_with("---\ntype: date\n---\n"));
    assert!(daily.ends_with("- standup\n"));

    assert!(!vault.root().join("people/freya.md").exists());
    let moved = vault.read("people/friends/freya.md");
    assert!(moved.contains("status: active"));
    assert!(moved.contains("name: Freya"));

    assert_eq!(
        vault.read("inbox.md"),
        "Met [[people/friends/freya]] today, see [[people/friends/freya#early-life|bio]].\nTODO twice\nTODO twice\n"
    );
    assert_eq!(
        vault.read("daily/2026-02-13.md"),
        "---\ntype: date\n---\n# Friday\n\n- @task(todo) buy oat milk\n- @task(done) call mum\n"
    );

    assert!(vault.db.get_object("people/freya").unwrap().is_none());
    assert!(vault.db.get_object("people/friends/freya").unwrap().is_some());
    assert!(vault.db.get_object("daily/2026-02-14").unwrap().is_some());
}

#[test]
fn update_trait_keeps_leading_marker() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"update_trait","why":"done","args":{"trait_id":"daily/2026-02-13.md:trait:0","value":"done"}}
        ]}"#,
    )
    .unwrap();
    apply_plan(&vault.ctx(), &plan, true).unwrap();
    assert!(vault.read("daily/2026-02-13.md").contains("\n- @task(done) buy milk\n"));

    let bad = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"update_trait","why":"x","args":{"trait_id":"daily/2026-02-13.md:trait:0","value":"maybe"}}
        ]}"#,
    )
    .unwrap();
    let err = preview_plan(&vault.ctx(), &bad).unwrap_err();
    assert!(err.to_string().starts_with("op[0] (update_trait): @task expects one of"));
}

#[test]
fn protected_paths_are_rejected() {
    let vault = Vault::new(protected_templates());
    let cases = [
        (r#"{"op":"edit","why":"x","args":{"path":"templates/person.md","old_str":"Template","new_str":"T"}}"#, "path is protected: templates/person.md"),
        (r#"{"op":"add","why":"x","args":{"to":"templates/person","text":"hi"}}"#, "target is protected: templates/person"),
        (r#"{"op":"move","why":"x","args":{"source":"inbox","destination":"templates/inbox"}}"#, "destination is protected: templates/inbox.md"),
        (r#"{"op":"edit","why":"x","args":{"path":"../outside.md","old_str":"a","new_str":"b"}}"#, ""),
        (r#"{"op":"edit","why":"x","args":{"path":"schema.yaml","old_str":"a","new_str":"b"}}"#, "path is protected: schema.yaml"),
    ];

    for (op, expected) in cases {
        let plan = parse_plan(&format!(r#"{{"plan_version":1,"ops":[{op}]}}"#)).unwrap();
        let preview = preview_plan(&vault.ctx(), &plan).unwrap_err();
        let apply = apply_plan(&vault.ctx(), &plan, true).unwrap_err();
        assert_eq!(preview.to_string(), apply.to_string());
        if !expected.is_empty() {
            assert!(preview.to_string().ends_with(expected), "{preview}");
        }
    }
    assert_eq!(vault.read("templates/person.md"), "# Template\n");
}

#[test]
fn set_refuses_sections_and_move_refuses_existing_destination() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"set","why":"x","args":{"object_id":"freya#early-life","fields":{"a":"b"}}}
        ]}"#,
    )
    .unwrap();
    let err = preview_plan(&vault.ctx(), &plan).unwrap_err();
    assert_eq!(err.to_string(), "op[0] (set): cannot set fields on a section: people/freya#early-life");

    let plan = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"move","why":"x","args":{"source":"inbox","destination":"people/freya"}}
        ]}"#,
    )
    .unwrap();
    let err = preview_plan(&vault.ctx(), &plan).unwrap_err();
    assert_eq!(err.to_string(), "op[0] (move): destination already exists: people/freya.md");
}

#[test]
fn add_to_missing_non_daily_note_is_rejected() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"plan_version":1,"ops":[{"op":"add","why":"x","args":{"to":"nowhere","text":"hi"}}]}"#,
    )
    .unwrap();
    let err = preview_plan(&vault.ctx(), &plan).unwrap_err();
    assert_eq!(err.to_string(), "op[0] (add): reference not found: nowhere");
}

#[test]
fn later_ops_see_earlier_edits() {
    let vault = Vault::new(VaultConfig::default());
    fs::write(vault.root().join("scratch.md"), "foo bar\n").unwrap();

    // After op 0 the file reads "bar bar", so op 1 is ambiguous
    let clash = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"edit","why":"a","args":{"path":"scratch.md","old_str":"foo","new_str":"bar"}},
            {"op":"edit","why":"b","args":{"path":"scratch.md","old_str":"bar","new_str":"baz"}}
        ]}"#,
    )
    .unwrap();
    let err = apply_plan(&vault.ctx(), &clash, true).unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(err.to_string(), "op[1] (edit): old_str must match exactly once (matches=2)");
    assert_eq!(vault.read("scratch.md"), "foo bar\n");

    let chained = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"edit","why":"a","args":{"path":"scratch.md","old_str":"foo","new_str":"qux"}},
            {"op":"edit","why":"b","args":{"path":"scratch.md","old_str":"qux bar","new_str":"done"}}
        ]}"#,
    )
    .unwrap();
    let outcome = apply_plan(&vault.ctx(), &chained, true).unwrap();
    assert_eq!(outcome.applied.len(), 2);
    assert_eq!(vault.read("scratch.md"), "done\n");
}

#[test]
fn adds_to_a_new_daily_note_accumulate() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"add","why":"a","args":{"to":"today","text":"first"}},
            {"op":"add","why":"b","args":{"to":"today","text":"second"}}
        ]}"#,
    )
    .unwrap();

    let preview = preview_plan(&vault.ctx(), &plan).unwrap();
    assert!(preview[0].summary.ends_with("(creates daily note)"));
    assert_eq!(preview[1].summary, "append to daily/2026-02-14");

    apply_plan(&vault.ctx(), &plan, true).unwrap();
    assert!(vault.read("daily/2026-02-14.md").ends_with("- first\n- second\n"));
}

#[test]
fn moved_file_is_gone_for_later_ops() {
    let vault = Vault::new(VaultConfig::default());
    let plan = parse_plan(
        r#"{"plan_version":1,"ops":[
            {"op":"move","why":"a","args":{"source":"inbox","destination":"archive/inbox"}},
            {"op":"edit","why":"b","args":{"path":"inbox.md","old_str":"Met","new_str":"Saw"}}
        ]}"#,
    )
    .unwrap();
    let err = apply_plan(&vault.ctx(), &plan, true).unwrap_err();
    assert_eq!(err.to_string(), "op[1] (edit): cannot read inbox.md: moved by an earlier op");
    assert!(vault.root().join("inbox.md").exists());
    assert!(!vault.root().join("archive/inbox.md").exists());
}
