use protoquery_dsl::{Aggregate, Directive};
use proptest::prelude::*;

fn path() -> impl Strategy<Value = String> {
    // Prefixed names as they appear in prototypes (`dbo:birthPlace`).
    proptest::string::string_regex("[a-z]{1,6}:[A-Za-z][A-Za-z0-9_]{0,10}").unwrap()
}

fn var_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,8}").unwrap()
}

fn flag() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("required"),
        Just("distinct"),
        Just("list"),
        Just("prevRoot"),
        Just("reverse"),
        Just("anchor"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pattern_path_survives_any_flag_order(p in path(), flags in proptest::collection::vec(flag(), 0..6)) {
        let mut text = format!("${p}");
        for f in &flags {
            text.push('$');
            text.push_str(f);
        }
        let directive = Directive::parse(&text).expect("parse").expect("directive");
        prop_assert_eq!(directive.path(), Some(p.as_str()));

        let opts = directive.options();
        prop_assert_eq!(opts.required, flags.contains(&"required"));
        prop_assert_eq!(opts.list, flags.contains(&"list"));
        prop_assert_eq!(opts.reverse, flags.contains(&"reverse"));
        prop_assert_eq!(opts.anchor, flags.contains(&"anchor"));
        prop_assert!(opts.unknown.is_empty());
    }

    #[test]
    fn explicit_var_always_wins(p in path(), name in var_name()) {
        let text = format!("${p}$var:{name}$required");
        let directive = Directive::parse(&text).expect("parse").expect("directive");
        let expected = format!("?{name}");
        prop_assert_eq!(directive.declared_var(), Some(expected.as_str()));
    }

    #[test]
    fn strings_without_sigil_pass_through(s in "[A-Za-z0-9:/#._ -]{0,24}") {
        prop_assert_eq!(Directive::parse(&s).expect("parse"), None);
    }
}

#[test]
fn aggregate_tokens_are_exclusive() {
    for (token, aggregate) in [
        ("sample", Aggregate::Sample),
        ("count", Aggregate::Count),
        ("sum", Aggregate::Sum),
        ("min", Aggregate::Min),
        ("max", Aggregate::Max),
        ("avg", Aggregate::Avg),
    ] {
        let directive = Directive::parse(&format!("$dbo:x${token}$sample$count"))
            .unwrap()
            .unwrap();
        assert_eq!(directive.options().aggregate, Some(aggregate), "{token}");
    }
}
