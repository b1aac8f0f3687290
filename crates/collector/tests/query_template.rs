use collector::QueryTemplate;

const PRE_2_21: [&str; 5] = [
    "ConnectedEvent",
    "DisconnectedEvent",
    "UnmarkedAsDuplicateEvent",
    "ConvertToDraftEvent",
    "isDraft",
];
const PRE_2_22: [&str; 2] = [
    "AutomaticBaseChangeFailedEvent",
    "AutomaticBaseChangeSucceededEvent",
];

fn selects(template: &QueryTemplate, name: &str) -> bool {
    let text = template.text();
    text.contains(&format!("... on {name} {{")) || text.contains(&format!("\n      {name}\n"))
}

#[test]
fn primary_host_ignores_server_version() {
    assert_eq!(QueryTemplate::build(true, "2.19.5"), QueryTemplate::full());
}

#[test]
fn old_enterprise_server_drops_every_gated_unit() {
    let template = QueryTemplate::build(false, "2.19.5");
    for name in PRE_2_21.iter().chain(PRE_2_22.iter()) {
        assert!(template.excludes(name), "{name} should be excluded");
        assert!(!selects(&template, name), "{name} still selected");
    }
    assert!(selects(&template, "ClosedEvent"));
    assert!(selects(&template, "mergedAt"));
}

#[test]
fn version_2_21_drops_only_the_newer_gate() {
    let template = QueryTemplate::build(false, "2.21.0");
    for name in PRE_2_21 {
        assert!(selects(&template, name), "{name} should be selected");
    }
    for name in PRE_2_22 {
        assert!(!selects(&template, name), "{name} still selected");
    }
}

#[test]
fn current_major_gets_the_full_template() {
    assert_eq!(QueryTemplate::build(false, "3.0.0"), QueryTemplate::full());
    assert_eq!(QueryTemplate::build(false, "2.22"), QueryTemplate::full());
}

#[test]
fn unparseable_version_falls_back_to_full_template() {
    assert_eq!(QueryTemplate::build(false, ""), QueryTemplate::full());
    assert_eq!(QueryTemplate::build(false, "enterprise"), QueryTemplate::full());
}

#[test]
fn gating_keeps_the_query_balanced() {
    let template = QueryTemplate::build(false, "2.20.9");
    let text = template.text();
    assert_eq!(text.matches('{').count(), text.matches('}').count());
    assert!(text.contains("nodes(ids: [__NODE_IDS__])"));
}
