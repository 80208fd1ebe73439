use tplvars::extract_template_variables;

fn variables(template: &str) -> Vec<String> {
    let extraction = extract_template_variables(template);
    assert!(
        extraction.error.is_none(),
        "unexpected error for {template:?}: {:?}",
        extraction.error
    );
    extraction.variables.into_vec()
}

mod scenarios {
    use super::*;

    #[test]
    fn simple_variable() {
        assert_eq!(variables("Hello {{ name }}!"), ["name"]);
    }

    #[test]
    fn attribute_chain_reports_root() {
        assert_eq!(variables("{{ user.profile.settings.theme }}"), ["user"]);
    }

    #[test]
    fn loop_variable_is_bound() {
        assert_eq!(
            variables("{% for item in items %}{{ item }}{% endfor %}"),
            ["items"]
        );
    }

    #[test]
    fn negated_condition() {
        assert_eq!(
            variables("{% if not user.is_banned %}OK{% endif %}"),
            ["user"]
        );
    }

    #[test]
    fn set_binds_its_target() {
        assert_eq!(
            variables("{% set total = price * quantity %}{{ total }}"),
            ["price", "quantity"]
        );
    }

    #[test]
    fn unclosed_tag_is_an_error() {
        let extraction = extract_template_variables("{% if unclosed");
        assert!(extraction.variables.is_empty());
        assert!(extraction.error.is_some_and(|message| !message.is_empty()));
    }
}

mod properties {
    use super::*;

    #[test]
    fn extraction_is_idempotent() {
        let template = "{% for u in users if u.active %}{{ u.name | title }}{% else %}{{ empty }}{% endfor %}{{ footer }}";
        assert_eq!(
            extract_template_variables(template),
            extract_template_variables(template)
        );
    }

    #[test]
    fn only_roots_are_reported() {
        assert_eq!(variables("{{ a.b.c[d] }}"), ["a", "d"]);
    }

    #[test]
    fn range_arguments_are_checked() {
        assert_eq!(
            variables("{% for i in range(start, stop) %}{{ i }}{% endfor %}"),
            ["start", "stop"]
        );
    }

    #[test]
    fn loop_variable_leaks_only_when_referenced_outside() {
        assert_eq!(
            variables("{% for x in xs %}{{ x }}{% endfor %}{{ x }}"),
            ["xs", "x"]
        );
    }

    #[test]
    fn set_value_is_resolved_before_binding() {
        assert_eq!(
            variables("{% set x = x + offset %}{{ x }}"),
            ["x", "offset"]
        );
    }

    #[test]
    fn builtins_are_never_reported() {
        assert!(variables(
            "{% for i in range(3) %}{{ loop.index }}{{ true }}{{ False }}{{ NONE }}{% endfor %}"
        )
        .is_empty());
    }

    #[test]
    fn no_delimiters_means_no_variables() {
        let extraction = extract_template_variables("plain text, {not a tag}");
        assert!(extraction.variables.is_empty());
        assert!(extraction.error.is_none());
    }

    #[test]
    fn first_reference_order_without_duplicates() {
        assert_eq!(
            variables("{{ b }}{{ a }}{{ b.c }}{% if a %}{{ c }}{% endif %}"),
            ["b", "a", "c"]
        );
    }
}

mod errors {
    use super::*;

    fn error(template: &str) -> String {
        let extraction = extract_template_variables(template);
        assert!(extraction.variables.is_empty());
        extraction.error.unwrap()
    }

    #[test]
    fn malformed_templates_never_yield_variables() {
        for template in [
            "{{ name",
            "{{ }}",
            "{% %}",
            "{% endif %}",
            "{% for x in xs %}{% endif %}",
            "{% bogus %}",
            "{{ (a + b }}",
            "{{ a b }}",
            "{# never closed",
            "{% raw %}{{ x }}",
            "{{ 'open }}",
        ] {
            assert!(!error(template).is_empty(), "{template:?}");
        }
    }

    #[test]
    fn messages() {
        insta::assert_snapshot!(error("{% endfor %}"), @"Unexpected 'endfor' with no open tag");
        insta::assert_snapshot!(error("{% unknown %}"), @"Unknown tag 'unknown'");
    }
}

mod realistic {
    use super::*;

    #[test]
    fn prompt_template() {
        let template = r#"
{% from "macros.j2" import bullet %}
{% set greeting = "Dear " ~ customer.first_name %}
{{ greeting }},

{% if orders | length > 0 %}
Your recent orders:
{% for order in orders | sort(attribute="date") %}
  {{ bullet(order.id ~ ": " ~ order.total | round(2)) }}{% if not loop.last %},{% endif %}
{% endfor %}
{% elif show_promotions %}
{% include "promo.j2" %}
{% endif %}

{# signature #}
{{ signature | default(company.name) }}
"#;
        assert_eq!(
            variables(template),
            ["customer", "orders", "show_promotions", "signature", "company"]
        );
    }
}
