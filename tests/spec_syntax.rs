use benchpark_spec::spec::lexer::TokenKind;
use benchpark_spec::spec::{Spec, SpecParser, parse_all};
use benchpark_spec::{SpecError, SpecLike};
use pretty_assertions::assert_eq;

fn roundtrip(text: &str) -> String {
    Spec::parse(text).unwrap().to_string()
}

#[test]
fn canonical_rendering() {
    let cases = [
        ("mvapich", "mvapich"),
        ("mvapich_foo", "mvapich_foo"),
        ("_mvapich_foo", "_mvapich_foo"),
        ("3dtk", "3dtk"),
        ("ns-3-dev", "ns-3-dev"),
        ("builtin.saxpy", "builtin.saxpy"),
        ("+foo", "+foo"),
        ("~foo", "~foo"),
        ("-foo", "~foo"),
        ("y~f+e~d+c~b+a", "y+a~b+c~d+e~f"),
        ("x ~ debug", "x~debug"),
        ("os=fe", "os=fe"),
        ("cflags=a=b=c", "cflags='a=b=c'"),
        (r#"cflags="-O3 -g""#, "cflags='-O3 -g'"),
        ("cflags=''", "cflags=''"),
        ("zlib cflags=-Wl,a,b,c", "zlib cflags=-Wl,a,b,c"),
        ("saxpy programming_model=cuda +debug", "saxpy+debug programming_model=cuda"),
    ];
    for (text, expected) in cases {
        assert_eq!(roundtrip(text), expected, "{text}");
    }
}

#[test]
fn rendering_is_a_fixed_point() {
    for text in [
        "y~f+e~d+c~b+a",
        "saxpy caliper=time,mpi +debug -qt",
        r#"zlib cflags="it's" ldflags=''"#,
        "builtin.amg2023 workload=problem2 scaling=weak",
        r#"x v="it's a\\b""#,
        r#"x v="it's \"this\"" w='a b'"#,
    ] {
        let once = roundtrip(text);
        assert_eq!(roundtrip(&once), once, "{text}");
    }
}

#[test]
fn escaped_values_survive_rendering() {
    let spec = Spec::parse(r#"x v="it's a\\b""#).unwrap();
    assert_eq!(spec.variants().get("v").unwrap(), &[r"it's a\b".to_string()]);
    assert_eq!(spec.to_string(), r#"x v="it's a\\b""#);
}

#[test]
fn boolean_polarity() {
    let plus = Spec::parse("+foo").unwrap();
    assert_eq!(plus.variants().get("foo").unwrap(), &["true".to_string()]);
    for text in ["~foo", "-foo"] {
        let minus = Spec::parse(text).unwrap();
        assert_eq!(minus.variants().get("foo").unwrap(), &["false".to_string()]);
    }
}

#[test]
fn multiple_specs() {
    let specs: Vec<String> = parse_all("mvapich cppflags='-O3 -fPIC' emacs")
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(specs, vec!["mvapich cppflags='-O3 -fPIC'", "emacs"]);
}

#[test]
fn command_line_arguments() {
    let cases: [(&[&str], Vec<&str>); 3] = [
        (&["zlib", "cflags=-O3 -g", "+bar", "baz"], vec!["zlib+bar cflags='-O3 -g'", "baz"]),
        (&["zlib cflags=-O3 -g +bar baz"], vec!["zlib+bar~g cflags=-O3", "baz"]),
        (&["zlib", "ldflags=", "+pic"], vec!["zlib+pic ldflags=''"]),
    ];
    for (args, expected) in cases {
        let specs: Vec<String> = SpecParser::from_args(args)
            .unwrap()
            .all_specs()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(specs, expected, "{args:?}");
    }
}

#[test]
fn command_line_errors() {
    let cases: [&[&str]; 2] = [&[" ldflags= +pic"], &["zlib", "\"-g", "-O2\""]];
    for args in cases {
        assert!(
            matches!(SpecParser::from_args(args), Err(SpecError::Tokenization(_))),
            "{args:?}"
        );
    }
}

#[test]
fn duplicate_variants() {
    for text in [
        "x+debug+debug",
        "x+debug debug=true",
        "x debug=false debug=true",
        "x debug=false ~debug",
    ] {
        let err = parse_all(text).unwrap_err();
        assert!(err.to_string().contains("variant 'debug'"), "{text}: {err}");
    }
}

#[test]
fn tokens_cover_input_or_fail() {
    for text in ["", "saxpy", "  a +b  c=d ", "builtin.x ~y z='q r'"] {
        let tokens = benchpark_spec::spec::lexer::tokenize(text).unwrap();
        let covered: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(covered, text);
    }

    let err = benchpark_spec::spec::lexer::tokenize("saxpy @1.0").unwrap_err();
    let SpecError::Tokenization(err) = err else {
        panic!("expected a tokenization error");
    };
    assert_eq!(err.unexpected(), vec!["@"]);
    assert_eq!(err.underline(), "      ^   ");
}

#[test]
fn parser_exposes_tokens_without_whitespace() {
    let parser = SpecParser::new("builtin.saxpy +debug n=4").unwrap();
    let kinds: Vec<TokenKind> = parser.tokens().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::FullyQualifiedName, TokenKind::BoolVariant, TokenKind::KeyValuePair]
    );
}

#[test]
fn partial_order_on_abstract_specs() {
    let a = Spec::parse("saxpy +debug caliper=time,mpi").unwrap();
    let b = Spec::parse("caliper=mpi").unwrap();
    assert!(a.satisfies(&b));
    assert!(!b.satisfies(&a));
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
    assert!(a.satisfies_str("+debug").unwrap());
    assert!(!a.intersects_str("~debug").unwrap());
}
