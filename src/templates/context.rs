//! Template context structures
//!
//! Converts a [`Contract`] into the flat, fully named view the fake template
//! renders. Every identifier the generated file declares is chosen here, so
//! the template never has to reason about collisions.

use crate::model::{Contract, ImportSet, MethodSignature, TypeRef};
use crate::util::{capitalize, lower_first};
use serde::Serialize;
use std::collections::HashSet;

/// Context for rendering one fake
#[derive(Debug, Clone, Serialize)]
pub struct FakeContext {
    /// Emit the "Code generated" header
    pub header: bool,
    /// Destination package
    pub package: String,
    /// Rendered import specs, sorted by path
    pub imports: Vec<String>,
    pub struct_name: String,
    pub constructor: String,
    /// The contract as seen from the destination package (`store.Store`)
    pub contract_ref: String,
    /// Type for the `var _ T = new(Fake)` assertion, if one is emitted
    pub assertion: Option<String>,
    /// `[K comparable, V any]` or empty
    pub type_params_decl: String,
    /// `[K, V]` or empty
    pub type_args: String,
    /// Name of the lock field
    pub mutex: String,
    pub methods: Vec<MethodView>,
}

/// Everything generated for one contract method
#[derive(Debug, Clone, Serialize)]
pub struct MethodView {
    pub name: String,
    pub params: Vec<ParamView>,
    pub returns: Vec<ReturnView>,
    /// `arg1 string, arg2 ...int`
    pub signature_params: String,
    /// Parameter types of the stub: `string, ...int`
    pub stub_params: String,
    /// `` / ` error` / ` (int, error)`
    pub results_decl: String,
    /// `arg1, arg2...`
    pub stub_args: String,
    pub stub_field: String,
    pub calls_field: String,
    pub returns_field: String,
    pub calls_accessor: String,
    pub call_count: String,
    pub returns_setter: String,
    /// Anonymous record type: `struct{ Arg1 string; Arg2 []int }`
    pub record_ref: String,
    /// Composite literal appended to the call log
    pub record_literal: String,
    /// `_result1 []byte, _result2 error`
    pub returns_params: String,
    /// `fake.getReturns._result1, fake.getReturns._result2`
    pub canned: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamView {
    /// `arg1`
    pub name: String,
    /// `Arg1`
    pub field: String,
    /// Type of the recorded value (`[]T` for a variadic `...T`)
    pub value_type: String,
    /// `arg1Copy` when the value is a slice that must be copied
    pub copy: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnView {
    pub field: String,
    pub typ: String,
}

/// Inputs beyond the contract itself
#[derive(Debug, Clone)]
pub struct FakeSettings<'a> {
    pub struct_name: &'a str,
    pub package_name: &'a str,
    pub header: bool,
}

/// Hands out identifiers within one Go namespace, suffixing on collision
#[derive(Debug, Default)]
pub(crate) struct Names {
    taken: HashSet<String>,
}

impl Names {
    pub(crate) fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// `base`, or `base2`, `base3`, ... when taken
    pub(crate) fn allocate(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

impl FakeContext {
    pub fn from_contract(contract: &Contract, settings: &FakeSettings<'_>) -> Self {
        let type_args = contract.type_args();
        let type_params_decl = contract.type_params_decl();

        // Fields and methods of the fake share one namespace, seeded with the
        // contract's own method names.
        let mut members = Names::default();
        for method in &contract.methods {
            members.reserve(&method.name);
        }
        let mutex = members.allocate("mutex");

        let mut top_level = Names::default();
        top_level.reserve(settings.struct_name);
        let constructor = top_level.allocate(&format!("New{}", capitalize(settings.struct_name)));

        let methods = contract
            .methods
            .iter()
            .map(|m| MethodView::build(m, &mut members))
            .collect();

        let contract_ref = match &contract.package.qualifier {
            Some(q) => format!("{}.{}", q, contract.name),
            None => contract.name.clone(),
        };
        let assertion = (contract.package.qualifier.is_some() && !contract.is_generic())
            .then(|| contract_ref.clone());

        let mut imports: ImportSet = contract.imports.clone();
        imports.add("sync", "sync");

        FakeContext {
            header: settings.header,
            package: settings.package_name.to_string(),
            imports: imports.lines().iter().map(ToString::to_string).collect(),
            struct_name: settings.struct_name.to_string(),
            constructor,
            contract_ref,
            assertion,
            type_params_decl,
            type_args,
            mutex,
            methods,
        }
    }
}

impl MethodView {
    fn build(method: &MethodSignature, members: &mut Names) -> Self {
        let name = &method.name;
        let exported = capitalize(name);

        let stub_field = members.allocate(&format!("{}Stub", name));
        let calls_accessor = members.allocate(&format!("{}Calls", exported));
        let call_count = members.allocate(&format!("{}CallCount", exported));
        let returns_setter = if method.results.is_empty() {
            String::new()
        } else {
            members.allocate(&format!("{}Returns", exported))
        };
        let calls_field = members.allocate(&format!("{}Calls", lower_first(name)));
        let returns_field = if method.results.is_empty() {
            String::new()
        } else {
            members.allocate(&format!("{}Returns", lower_first(name)))
        };

        let params: Vec<ParamView> = method
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let value_type: TypeRef = p.value_type();
                let arg = format!("arg{}", i + 1);
                ParamView {
                    copy: value_type.is_slice().then(|| format!("{}Copy", arg)),
                    field: capitalize(&arg),
                    value_type: value_type.to_string(),
                    name: arg,
                }
            })
            .collect();

        let signature_params = method
            .params
            .iter()
            .zip(&params)
            .map(|(p, view)| format!("{} {}", view.name, p.declared_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let stub_params = method
            .params
            .iter()
            .map(|p| p.declared_type())
            .collect::<Vec<_>>()
            .join(", ");
        let stub_args = params
            .iter()
            .zip(&method.params)
            .map(|(view, p)| {
                if p.variadic {
                    format!("{}...", view.name)
                } else {
                    view.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let record_ref = record_type(&params);
        let record_literal = format!(
            "{}{{{}}}",
            record_ref,
            params
                .iter()
                .map(|p| format!("{}: {}", p.field, p.copy.as_ref().unwrap_or(&p.name)))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let returns = return_fields(method);
        let results_decl = match method.results.as_slice() {
            [] => String::new(),
            [only] => format!(" {}", only.typ),
            many => format!(
                " ({})",
                many.iter()
                    .map(|r| r.typ.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let returns_params = returns
            .iter()
            .map(|r| format!("{} {}", r.field, r.typ))
            .collect::<Vec<_>>()
            .join(", ");
        let canned = returns
            .iter()
            .map(|r| format!("fake.{}.{}", returns_field, r.field))
            .collect::<Vec<_>>()
            .join(", ");

        MethodView {
            name: name.clone(),
            params,
            returns,
            signature_params,
            stub_params,
            results_decl,
            stub_args,
            stub_field,
            calls_field,
            returns_field,
            calls_accessor,
            call_count,
            returns_setter,
            record_ref,
            record_literal,
            returns_params,
            canned,
        }
    }
}

/// Unnamed record type holding one call's arguments. Only parameter types
/// appear in it, never result types.
fn record_type(params: &[ParamView]) -> String {
    if params.is_empty() {
        return "struct{}".to_string();
    }
    let fields = params
        .iter()
        .map(|p| format!("{} {}", p.field, p.value_type))
        .collect::<Vec<_>>()
        .join("; ");
    format!("struct{{ {} }}", fields)
}

/// Canned-return field names: the source name when it is usable, otherwise
/// `_resultN` for position N, extended with `_` until unique
fn return_fields(method: &MethodSignature) -> Vec<ReturnView> {
    let mut taken: HashSet<String> = HashSet::new();
    method
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let usable = !r.name.is_empty()
                && r.name != "_"
                && r.name != "fake"
                && !taken.contains(&r.name);
            let field = if usable {
                r.name.clone()
            } else {
                let mut candidate = format!("_result{}", i + 1);
                while taken.contains(&candidate) {
                    candidate.push('_');
                }
                candidate
            };
            taken.insert(field.clone());
            ReturnView {
                field,
                typ: r.typ.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, PackageContext, Parameter, ReturnValue, TypeParam};
    use std::path::PathBuf;

    fn ret(name: &str, typ: &str) -> ReturnValue {
        ReturnValue {
            name: name.into(),
            typ: TypeRef::builtin(typ),
        }
    }

    fn method(name: &str, params: Vec<Parameter>, results: Vec<ReturnValue>) -> MethodSignature {
        MethodSignature {
            name: name.into(),
            params,
            results,
            location: Location::new("a.go", 1),
        }
    }

    fn contract(methods: Vec<MethodSignature>) -> Contract {
        Contract {
            name: "Store".into(),
            type_params: Vec::new(),
            methods,
            package: PackageContext {
                name: "store".into(),
                dir: PathBuf::from("/src/store"),
                import_path: None,
                qualifier: None,
            },
            imports: ImportSet::new(),
        }
    }

    fn settings() -> FakeSettings<'static> {
        FakeSettings {
            struct_name: "FakeStore",
            package_name: "storefakes",
            header: true,
        }
    }

    #[test]
    fn test_return_field_names() {
        let m = method(
            "Get",
            vec![],
            vec![
                ret("", "int"),
                ret("err", "error"),
                ret("_", "bool"),
                ret("fake", "string"),
                ret("err", "error"),
            ],
        );
        let fields: Vec<String> = return_fields(&m).into_iter().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec!["_result1", "err", "_result3", "_result4", "_result5"]
        );
    }

    #[test]
    fn test_member_names_avoid_contract_methods() {
        let c = contract(vec![
            method("Get", vec![], vec![ret("", "error")]),
            method("GetCalls", vec![], vec![]),
            method("mutex", vec![], vec![]),
        ]);
        let ctx = FakeContext::from_contract(&c, &settings());
        assert_eq!(ctx.mutex, "mutex2");
        assert_eq!(ctx.methods[0].calls_accessor, "GetCalls2");
        assert_eq!(ctx.methods[0].calls_field, "getCalls");
        assert_eq!(ctx.methods[1].calls_accessor, "GetCallsCalls");
        assert_eq!(ctx.methods[2].calls_accessor, "MutexCalls");
        assert_eq!(ctx.methods[2].calls_field, "mutexCalls");
        assert_eq!(ctx.imports, vec!["\"sync\""]);
    }

    #[test]
    fn test_variadic_and_slice_params_are_copied() {
        let c = contract(vec![method(
            "Log",
            vec![
                Parameter {
                    name: "prefix".into(),
                    typ: TypeRef::builtin("string"),
                    variadic: false,
                },
                Parameter {
                    name: "rest".into(),
                    typ: TypeRef::builtin("int"),
                    variadic: true,
                },
            ],
            vec![],
        )]);
        let ctx = FakeContext::from_contract(&c, &settings());
        let m = &ctx.methods[0];
        assert_eq!(m.signature_params, "arg1 string, arg2 ...int");
        assert_eq!(m.stub_params, "string, ...int");
        assert_eq!(m.stub_args, "arg1, arg2...");
        assert_eq!(m.params[1].value_type, "[]int");
        assert_eq!(m.params[1].copy.as_deref(), Some("arg2Copy"));
        assert_eq!(m.record_ref, "struct{ Arg1 string; Arg2 []int }");
        assert_eq!(
            m.record_literal,
            "struct{ Arg1 string; Arg2 []int }{Arg1: arg1, Arg2: arg2Copy}"
        );
        assert!(m.returns_setter.is_empty());
    }

    #[test]
    fn test_records_follow_params_not_results() {
        let mut c = contract(vec![
            method(
                "Get",
                vec![],
                vec![ReturnValue {
                    name: String::new(),
                    typ: TypeRef::param("T"),
                }],
            ),
            method(
                "Put",
                vec![Parameter {
                    name: String::new(),
                    typ: TypeRef::param("T"),
                    variadic: false,
                }],
                vec![],
            ),
        ]);
        c.type_params = vec![TypeParam {
            name: "T".into(),
            constraint: TypeRef::builtin("any"),
        }];
        let ctx = FakeContext::from_contract(&c, &settings());
        assert_eq!(ctx.type_params_decl, "[T any]");
        // Get returns T but takes nothing: its record must not mention T.
        assert_eq!(ctx.methods[0].record_ref, "struct{}");
        assert_eq!(ctx.methods[0].record_literal, "struct{}{}");
        assert_eq!(ctx.methods[1].record_ref, "struct{ Arg1 T }");
        assert_eq!(ctx.methods[1].record_literal, "struct{ Arg1 T }{Arg1: arg1}");
        assert!(ctx.assertion.is_none());
    }

    #[test]
    fn test_assertion_needs_qualifier() {
        let mut c = contract(vec![method("Close", vec![], vec![ret("", "error")])]);
        c.package.qualifier = Some("store".into());
        let ctx = FakeContext::from_contract(&c, &settings());
        assert_eq!(ctx.contract_ref, "store.Store");
        assert_eq!(ctx.assertion.as_deref(), Some("store.Store"));
        assert_eq!(ctx.constructor, "NewFakeStore");
        assert_eq!(ctx.methods[0].canned, "fake.closeReturns._result1");
    }
}
