//! Integration tests for methods, prototypes, templates, includes,
//! resources, load parameters and link failure modes

use std::fs;
use std::rc::Rc;

use graph_loader::registry::{ObjectFactory, TypeResolver};
use graph_loader::{
    component_any, Component, ComponentError, DocumentAssets, LinkFailureMode, LoadError,
    LoadParameters, LoadReport, Loader, LoaderConfig, MethodTable, Record, Services, Severity,
    Signature, TypeHandle, TypeRegistry, Value,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Component with no attachment capability at all
#[derive(Debug)]
struct Plain;

impl Component for Plain {
    component_any!();

    fn type_name(&self) -> &str {
        "Plain"
    }
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_record("Node");
    registry.register_record("Scene");
    registry.register_record("Math");
    registry.register("Plain", Signature::empty(), |_| Ok(Value::object(Plain)));
    registry
}

fn methods() -> MethodTable {
    let mut methods = MethodTable::new();
    methods.register("Node", "Sum", Signature::new(["int", "int"]), |_, args| {
        let total = args.iter().filter_map(Value::as_i64).sum::<i64>();
        Ok(Some(Value::Long(total)))
    });
    methods.register("Node", "Rename", Signature::new(["string"]), |receiver, args| {
        receiver.with_object_mut(|r: &mut Record| {
            r.set_name(args[0].as_str().unwrap_or_default());
        });
        Ok(None)
    });
    methods.register("Math", "Max", Signature::new(["int", "int"]), |_, args| {
        Ok(args.iter().filter_map(Value::as_i64).max().map(Value::Long))
    });
    methods
}

fn loader(config: LoaderConfig) -> Loader {
    Loader::new(
        Services::new(registry())
            .with_methods(methods())
            .with_assets(Rc::new(DocumentAssets))
            .with_config(config),
    )
}

fn load(source: &str) -> LoadReport {
    loader(LoaderConfig::default()).load_str(source)
}

fn prop(value: &Value, name: &str) -> Option<Value> {
    value
        .with_object(|r: &Record| r.property(name).cloned())
        .flatten()
}

#[test]
fn test_constructor_parameters() {
    let report = load(
        r#"<Node>
            <parameters><string value="left"/><int value="3"/></parameters>
            <int value="9" property="Extra"/>
        </Node>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let node = report.value.expect("node");
    assert_eq!(prop(&node, "Arg0"), Some(Value::from("left")));
    assert_eq!(prop(&node, "Arg1"), Some(Value::Int(3)));
    assert_eq!(prop(&node, "Extra"), Some(Value::Int(9)));
}

#[test]
fn test_method_on_enclosing_object() {
    let report = load(
        r#"<Node>
            <method call="Sum" property="Total">
                <parameters><int value="2"/><int value="3"/></parameters>
            </method>
            <method call="Rename">
                <parameters><string value="renamed"/></parameters>
            </method>
        </Node>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let node = report.value.expect("node");
    assert_eq!(prop(&node, "Total"), Some(Value::Long(5)));
    assert_eq!(node.to_string(), "Node \"renamed\"");
}

#[test]
fn test_static_method_on_type() {
    let report = load(
        r#"<Node>
            <method call="Max" type="Math" property="Best">
                <parameters><int value="2"/><int value="7"/></parameters>
            </method>
        </Node>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    assert_eq!(prop(&report.value.expect("node"), "Best"), Some(Value::Long(7)));
}

#[test]
fn test_method_overloads_use_runtime_types() {
    let report = load(
        r#"<Node>
            <method call="Sum"><parameters><string value="2"/><int value="3"/></parameters></method>
        </Node>"#,
    );
    let errors: Vec<_> = report.diagnostics.iter().map(|d| d.error.to_string()).collect();
    assert_eq!(errors, vec!["cannot construct Node.Sum"]);
    let cause = report.diagnostics.iter().next().expect("one").causes();
    assert_eq!(cause, vec!["no overload of 'Node.Sum' accepts (string, int)"]);
}

#[test]
fn test_builder_keyword_creates_objects() {
    let report = load(
        r#"<Scene>
            <method call="Create" objectId="builder" property="Made">
                <parameters><type value="Node"/><int value="1"/></parameters>
            </method>
        </Scene>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let made = prop(&report.value.expect("scene"), "Made").expect("Made");
    assert_eq!(made.type_name(), "Node");
    assert_eq!(prop(&made, "Arg0"), Some(Value::Int(1)));
}

#[test]
fn test_inline_prototype_is_copied() {
    let report = load(
        r#"<Scene>
            <instance property="Copy">
                <Node name="original"><int value="5" property="Size"/></Node>
            </instance>
        </Scene>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let copy = prop(&report.value.expect("scene"), "Copy").expect("Copy");
    assert_eq!(prop(&copy, "Size"), Some(Value::Int(5)));
    assert_eq!(copy.to_string(), "Node \"original\"");
}

#[test]
fn test_inline_prototype_inside_pre_link() {
    let report = load(
        r#"<Scene>
            <instance property="Copy">
                <preLink><Node name="p"/></preLink>
            </instance>
        </Scene>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let copy = prop(&report.value.expect("scene"), "Copy").expect("Copy");
    assert_eq!(copy.to_string(), "Node \"p\"");
}

#[test]
fn test_prototype_by_reference_is_a_new_object() {
    let report = load(
        r#"<rb><Scene>
            <Node id="proto" property="Proto"/>
            <instance objectId="proto" property="Copy"/>
        </Scene></rb>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let scene = report.value.expect("scene");
    let proto = prop(&scene, "Proto").expect("Proto");
    let copy = prop(&scene, "Copy").expect("Copy");
    assert_eq!(copy.type_name(), "Node");
    assert!(!copy.same(&proto));
}

#[test]
fn test_instance_needs_a_single_source() {
    let report = load(r#"<rb><Scene><instance/></Scene></rb>"#);
    assert_eq!(report.diagnostics.of_kind("structural error").count(), 1);
}

#[test]
fn test_template_instances_are_independent() {
    let report = load(
        r#"<rb><Scene>
            <template id="t" property="Template">
                <Node><int value="5" property="Size"/></Node>
            </template>
            <instance objectId="t" property="A"/>
            <instance objectId="t" property="B"/>
        </Scene></rb>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let scene = report.value.expect("scene");
    let a = prop(&scene, "A").expect("A");
    let b = prop(&scene, "B").expect("B");
    assert!(!a.same(&b));
    assert_eq!(prop(&a, "Size"), Some(Value::Int(5)));
    assert_eq!(prop(&b, "Size"), Some(Value::Int(5)));
}

#[test]
fn test_template_ids_do_not_leak() {
    let report = load(
        r#"<rb><Scene>
            <template id="t" property="Template"><Node id="inner"/></template>
            <instance objectId="t" property="A"/>
            <ref objectId="inner" property="Leak"/>
        </Scene></rb>"#,
    );
    let errors: Vec<_> = report.diagnostics.iter().map(|d| d.error.clone()).collect();
    assert_eq!(errors, vec![LoadError::not_found("inner")]);
}

fn write(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).expect("write fixture");
}

#[test]
fn test_include_loads_relative_to_base_path() {
    let dir = TempDir::new().unwrap();
    write(&dir, "part.xml", r#"<Node name="part" id="shared"/>"#);
    let config = LoaderConfig::new().with_base_path(dir.path());
    let report = loader(config).load_str(
        r#"<rb><Scene>
            <Node id="shared" property="Local"/>
            <include path="part.xml" property="Part"/>
        </Scene></rb>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let part = prop(&report.value.expect("scene"), "Part").expect("Part");
    assert_eq!(part.to_string(), "Node \"part\"");
}

#[test]
fn test_circular_include_is_structural() {
    let dir = TempDir::new().unwrap();
    write(&dir, "loop.xml", r#"<include path="loop.xml"/>"#);
    let config = LoaderConfig::new().with_base_path(dir.path());
    let report = loader(config)
        .load_file(&dir.path().join("loop.xml"))
        .expect("readable");
    let first = report.diagnostics.iter().next().expect("a diagnostic");
    assert!(matches!(first.error, LoadError::Structural { .. }));
    assert!(first.error.to_string().starts_with("circular include"));
}

#[test]
fn test_circular_resource_is_structural() {
    let dir = TempDir::new().unwrap();
    write(&dir, "self.xml", r#"<Node><resource path="self.xml"/></Node>"#);
    let config = LoaderConfig::new().with_base_path(dir.path());
    let report = loader(config)
        .load_file(&dir.path().join("self.xml"))
        .expect("readable");
    let first = report.diagnostics.iter().next().expect("a diagnostic");
    assert!(matches!(first.error, LoadError::Structural { .. }));
    assert!(first.error.to_string().starts_with("circular resource"));
}

#[test]
fn test_resource_cycle_through_include_is_caught() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.xml", r#"<Node><resource path="b.xml"/></Node>"#);
    write(&dir, "b.xml", r#"<Node><include path="a.xml"/></Node>"#);
    let config = LoaderConfig::new().with_base_path(dir.path());
    let report = loader(config).load_str(r#"<rb><resource path="a.xml"/></rb>"#);
    let first = report.diagnostics.iter().next().expect("a diagnostic");
    assert!(matches!(first.error, LoadError::Construction { .. }));
    assert!(first.causes()[0].contains("circular"));
}

#[test]
fn test_failed_include_carries_nested_cause() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.xml", r#"<rb><bogus/></rb>"#);
    let config = LoaderConfig::new().with_base_path(dir.path());
    let report = loader(config).load_str(r#"<rb><include path="broken.xml"/></rb>"#);
    let first = report.diagnostics.iter().next().expect("a diagnostic");
    assert!(matches!(first.error, LoadError::Construction { .. }));
    assert!(first.causes()[0].contains("unknown element <bogus>"));
}

#[test]
fn test_resource_uses_current_parameters_on_request() {
    let dir = TempDir::new().unwrap();
    write(&dir, "sized.xml", r#"<Node><dynProperty value="size" property="Size"/></Node>"#);
    let loader = loader(LoaderConfig::new().with_base_path(dir.path()));
    let parameters = LoadParameters::new().with_property("size", Value::Int(7));

    let report = loader.load_with_parameters(
        r#"<Scene><resource path="sized.xml" useCurrentParameters="true" property="R"/></Scene>"#,
        parameters.clone(),
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let resource = prop(&report.value.expect("scene"), "R").expect("R");
    assert_eq!(prop(&resource, "Size"), Some(Value::Int(7)));

    let report = loader.load_with_parameters(
        r#"<Scene><resource path="sized.xml" property="R"/></Scene>"#,
        parameters,
    );
    assert_eq!(report.diagnostics.of_kind("construction error").count(), 1);
}

#[test]
fn test_resource_without_asset_loader() {
    let report = Loader::with_registry(registry()).load_str(r#"<rb><resource path="x.xml"/></rb>"#);
    let first = report.diagnostics.iter().next().expect("a diagnostic");
    assert_eq!(first.causes(), vec!["no asset loader is configured"]);
}

#[test]
fn test_parameters_keyword_and_dynamic_keys() {
    let config = LoaderConfig::new().with_parameter("quality", "high");
    let report = loader(config).load_str(
        r#"<Node>
            <ref objectId="parameters" access="quality" property="Quality"/>
            <int value="3" dynProperty="speed"/>
        </Node>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let node = report.value.expect("node");
    assert_eq!(prop(&node, "Quality"), Some(Value::from("high")));
    let speed = node
        .with_object(|r: &Record| r.dynamic().get("speed").cloned())
        .flatten();
    assert_eq!(speed, Some(Value::Int(3)));
}

#[test]
fn test_load_into_target() {
    let target = Value::object(Record::new("Scene"));
    let report = loader(LoaderConfig::default())
        .load_into(r#"<Node name="a"/><Node name="b"/>"#, target.clone());
    assert!(report.is_ok(), "{}", report.diagnostics);
    assert!(report.value.expect("target").same(&target));
    let names: Vec<String> = target
        .with_object(|r: &Record| r.children())
        .unwrap_or_default()
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(names, vec!["Node \"a\"", "Node \"b\""]);
}

#[test]
fn test_link_failure_modes() {
    let source = r#"<Plain><int value="1"/></Plain>"#;

    let lenient = loader(LoaderConfig::default()).load_str(source);
    assert!(lenient.is_ok(), "{}", lenient.diagnostics);

    let warn = loader(LoaderConfig::new().with_link_failures(LinkFailureMode::Warn)).load_str(source);
    let severities: Vec<_> = warn.diagnostics.iter().map(|d| d.severity).collect();
    assert_eq!(severities, vec![Severity::Warning]);
    assert!(!warn.is_ok());

    let strict = loader(LoaderConfig::new().with_link_failures(LinkFailureMode::Error)).load_str(source);
    assert!(strict.diagnostics.has_errors());
    assert!(matches!(
        strict.diagnostics.iter().next().map(|d| &d.error),
        Some(LoadError::LinkTarget { .. })
    ));
}

#[test]
fn test_failing_property_path_is_a_link_error() {
    let report = load(r#"<Node><int value="1" property="Missing.Deeper"/></Node>"#);
    let first = report.diagnostics.iter().next().expect("a diagnostic");
    assert!(matches!(first.error, LoadError::LinkTarget { cause: Some(_), .. }));
}

/// Resolver that only knows a module-qualified `Lamp`
struct LampResolver;

impl TypeResolver for LampResolver {
    fn resolve(&self, name: &str, module: Option<&str>) -> Option<TypeHandle> {
        (name == "Lamp" && module == Some("lights")).then(|| TypeHandle::in_module("Lamp", "lights"))
    }
}

/// Factory that records the handle it was asked for
struct StampFactory;

impl ObjectFactory for StampFactory {
    fn create(&self, ty: &TypeHandle, args: &[Value]) -> Result<Value, ComponentError> {
        let record = Record::with_arguments(ty.name.clone(), args)
            .with_property("Module", ty.to_string().into());
        Ok(Value::object(record))
    }
}

#[test]
fn test_custom_resolver_and_factory() {
    let services = Services::new(TypeRegistry::new())
        .with_resolver(Rc::new(LampResolver))
        .with_factory(Rc::new(StampFactory));
    let report = Loader::new(services).load_str(
        r#"<Lamp assembly="lights"><parameters><int value="40"/></parameters></Lamp>"#,
    );
    assert!(report.is_ok(), "{}", report.diagnostics);
    let lamp = report.value.expect("lamp");
    assert_eq!(prop(&lamp, "Module"), Some(Value::from("Lamp, lights")));
    assert_eq!(prop(&lamp, "Arg0"), Some(Value::Int(40)));

    let services = Services::new(TypeRegistry::new()).with_resolver(Rc::new(LampResolver));
    let report = Loader::new(services).load_str(r#"<Lamp/>"#);
    assert_eq!(report.diagnostics.of_kind("grammar error").count(), 1);
}

#[test]
fn test_load_already_parsed_document() {
    let document = graph_loader::parse(r#"<Node name="parsed"/>"#).expect("parses");
    let loader = loader(LoaderConfig::default());
    let first = loader.load_document(&document).value.expect("node");
    let second = loader.load_document(&document).value.expect("node");
    assert_eq!(first.to_string(), "Node \"parsed\"");
    assert!(!first.same(&second));
}
