use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use tplvars_templates::parse_template;
use tplvars_templates::Lexer;

const PROMPT: &str = r#"{% set greeting = "Hello" if formal else "Hi" %}
{{ greeting }} {{ user.profile.first_name | title }},

{% for item in order.items if item.quantity > 0 %}
  - {{ item.name }} x{{ item.quantity }} at {{ item.price | round(2) }}
{% else %}
  Your order is empty.
{% endfor %}

{% macro row(label, value=default_value) -%}
  {{ label }}: {{ value }}
{%- endmacro %}
{{ row("Total", order.total * (1 + tax_rate)) }}
{# footer #}
{% raw %}{{ not a variable }}{% endraw %}
"#;

fn bench_lexer(c: &mut Criterion) {
    c.bench_function("lex prompt", |b| {
        b.iter(|| Lexer::new(black_box(PROMPT)).tokenize());
    });
}

fn bench_parser(c: &mut Criterion) {
    let large = PROMPT.repeat(200);

    c.bench_function("parse prompt", |b| {
        b.iter(|| parse_template(black_box(PROMPT)));
    });
    c.bench_function("parse large prompt", |b| {
        b.iter(|| parse_template(black_box(&large)));
    });
}

criterion_group!(benches, bench_lexer, bench_parser);
criterion_main!(benches);
