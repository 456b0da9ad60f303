//! Property-based tests for fake generation
//!
//! Uses proptest to generate random contracts and check that output is
//! deterministic and has one recording slot per method argument

use counterfeit::model::{
    Contract, ImportSet, Location, MethodSignature, PackageContext, Parameter, ReturnValue,
    TypeRef,
};
use counterfeit::{generate_fake, generate_interface};
use proptest::prelude::*;
use std::path::PathBuf;

const TYPES: &[&str] = &["int", "string", "bool", "error", "float64", "byte"];

fn any_type() -> impl Strategy<Value = TypeRef> {
    prop_oneof![
        prop::sample::select(TYPES).prop_map(TypeRef::builtin),
        prop::sample::select(TYPES).prop_map(|t| TypeRef::Slice(Box::new(TypeRef::builtin(t)))),
        prop::sample::select(TYPES).prop_map(|t| TypeRef::pointer(TypeRef::builtin(t))),
    ]
}

fn any_method(name: String) -> impl Strategy<Value = MethodSignature> {
    (
        prop::collection::vec(any_type(), 0..4),
        any::<bool>(),
        prop::collection::vec(any_type(), 0..3),
    )
        .prop_map(move |(params, variadic, results)| {
            let count = params.len();
            MethodSignature {
                name: name.clone(),
                params: params
                    .into_iter()
                    .enumerate()
                    .map(|(i, typ)| Parameter {
                        name: format!("p{}", i),
                        typ,
                        variadic: variadic && i + 1 == count,
                    })
                    .collect(),
                results: results
                    .into_iter()
                    .map(|typ| ReturnValue {
                        name: String::new(),
                        typ,
                    })
                    .collect(),
                location: Location::new("gen.go", 1),
            }
        })
}

fn any_contract() -> impl Strategy<Value = Contract> {
    prop::sample::subsequence(
        vec!["Get", "Put", "Close", "Lock", "Calls", "GetCalls", "mutex", "Reset"],
        1..6,
    )
    .prop_flat_map(|names| {
        names
            .into_iter()
            .map(|n| any_method(n.to_string()))
            .collect::<Vec<_>>()
    })
    .prop_map(|methods| Contract {
        name: "Thing".into(),
        type_params: Vec::new(),
        methods,
        package: PackageContext {
            name: "thing".into(),
            dir: PathBuf::from("/src/thing"),
            import_path: None,
            qualifier: None,
        },
        imports: ImportSet::new(),
    })
}

proptest! {
    #[test]
    fn test_fake_generation_is_deterministic(contract in any_contract()) {
        let first = generate_fake(&contract, "FakeThing", "thingfakes").unwrap();
        let second = generate_fake(&contract, "FakeThing", "thingfakes").unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_interface_generation_is_deterministic(contract in any_contract()) {
        let first = generate_interface(&contract, "thingfakes").unwrap();
        let second = generate_interface(&contract, "thingfakes").unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_every_method_is_implemented_once(contract in any_contract()) {
        let code = generate_fake(&contract, "FakeThing", "thingfakes").unwrap();
        for method in &contract.methods {
            let receiver = format!("func (fake *FakeThing) {}(", method.name);
            prop_assert_eq!(code.matches(&receiver).count(), 1, "{}", receiver);
        }
    }

    #[test]
    fn test_one_record_field_per_argument(contract in any_contract()) {
        let code = generate_fake(&contract, "FakeThing", "thingfakes").unwrap();
        for method in &contract.methods {
            let receiver = format!("func (fake *FakeThing) {}(", method.name);
            let start = code.find(&receiver);
            prop_assert!(start.is_some(), "missing {}", receiver);
            let body = &code[start.unwrap_or_default()..];
            let append = body
                .lines()
                .find(|line| line.contains("= append(fake."))
                .unwrap_or_default();
            // each argument is named once in the record type and once in the literal
            prop_assert_eq!(append.matches("Arg").count(), 2 * method.params.len(), "{}", append);
        }
    }
}
