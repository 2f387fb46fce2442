use benchpark_spec::repo::{builtin, manifest};
use benchpark_spec::{RepoPath, Spec, SpecError};
use pretty_assertions::assert_eq;
use std::io::Write;

const SITE: &str = r#"{
    "namespace": "mysite",
    "experiments": [
        {
            "name": "stream",
            "description": "Memory bandwidth",
            "inherits": ["experiment", "cuda"],
            "variants": [
                { "name": "size", "default": "small", "values": ["small", "large"] },
                { "name": "threads", "default": 4, "values": "int" },
                { "name": "pinned", "default": "none", "when": "+pin" },
                { "name": "pin", "default": false, "sticky": true }
            ]
        },
        { "name": "saxpy", "variants": [ { "name": "n", "default": "1024" } ] }
    ],
    "systems": [
        { "name": "mybox", "variants": [ { "name": "compiler", "default": "gcc", "values": ["gcc"] } ] }
    ]
}"#;

fn write_manifest(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn site_path() -> RepoPath {
    let caps = builtin::capabilities().unwrap();
    let file = write_manifest(SITE);
    let validated = manifest::load_manifest(file.path(), &caps).unwrap();

    let mut path = RepoPath::from_repos([builtin::experiments(&caps).unwrap()]);
    path.put_first(validated.experiments);
    path
}

#[test]
fn manifest_types_concretize() {
    let path = site_path();
    let c = Spec::parse("stream size=large")
        .unwrap()
        .concretize(&path)
        .unwrap();
    assert_eq!(
        c.to_string(),
        "mysite.stream~pin cuda=non scaling-factor=2 scaling-iterations=4 size=large threads=4"
    );

    let c = Spec::parse("stream +pin").unwrap().concretize(&path).unwrap();
    assert_eq!(c.value("pinned"), Some("none"));
}

#[test]
fn shared_names_need_a_namespace() {
    let path = site_path();
    let err = Spec::parse("saxpy").unwrap().concretize(&path).unwrap_err();
    assert!(matches!(err, SpecError::AmbiguousSpecType { .. }));

    let site = Spec::parse("mysite.saxpy").unwrap().concretize(&path).unwrap();
    assert_eq!(site.to_string(), "mysite.saxpy n=1024");
    let builtin = Spec::parse("builtin.saxpy").unwrap().concretize(&path).unwrap();
    assert_eq!(builtin.value("programming_model"), Some("openmp"));
}

#[test]
fn sticky_condition_is_not_adopted() {
    let path = site_path();
    let err = Spec::parse("stream pinned=0-3")
        .unwrap()
        .concretize(&path)
        .unwrap_err();
    assert!(matches!(err, SpecError::UnmetCondition { .. }));
}

#[test]
fn load_errors_carry_the_path() {
    let caps = builtin::capabilities().unwrap();

    let file = write_manifest("{ not json");
    let err = manifest::load_manifest(file.path(), &caps).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("parse repository manifest"));
    assert!(chain.contains(&file.path().display().to_string()));

    let file = write_manifest(
        r#"{ "namespace": "s", "experiments": [{ "name": "x", "variants": [{ "name": "bad name", "default": "a" }] }] }"#,
    );
    let err = manifest::load_manifest(file.path(), &caps).unwrap_err();
    assert!(format!("{err:#}").contains("invalid variant name"));

    let missing = std::path::Path::new("/nonexistent/benchpark/repo.json");
    let err = manifest::load_manifest(missing, &caps).unwrap_err();
    assert!(format!("{err:#}").contains("read repository manifest"));
}
