use super::*;
use crate::clause::{CompositeWhereClause, NamedParameterList};
use crate::dialect::Postgres;
use proptest::prelude::*;

fn select(fields: &str) -> SelectHeader {
    SelectHeader::new(fields, Arc::new(Postgres::new()))
}

fn text(query: &impl ToStatement) -> String {
    query.to_statement().text().to_string()
}

#[test]
fn where_then_and() {
    let stmt = select("name")
        .from("agent")
        .filter("age > ?", 30)
        .filter("country", "UK")
        .filter_raw("retired IS NULL")
        .expect("raw");
    assert_eq!(
        text(&stmt),
        "SELECT name FROM agent WHERE age > ? AND country = ? AND retired IS NULL"
    );
    assert_eq!(
        stmt.to_statement().params(),
        &[Parameter::from(30), Parameter::from("UK")]
    );
    assert_eq!(
        stmt.to_statement().to_sql(),
        "SELECT name FROM agent WHERE age > $1 AND country = $2 AND retired IS NULL"
    );
}

#[test]
fn raw_filter_with_marker_is_rejected() {
    let err = select("*")
        .from("agent")
        .filter_raw("id = ?")
        .expect_err("marker without parameter");
    assert!(err.is_usage());
}

#[test]
fn parameters_in_field_list_come_first() {
    let stmt = select("name, age > ? AS senior")
        .parameter(65)
        .from("agent")
        .filter("country", "BE");
    assert_eq!(
        stmt.to_statement().params(),
        &[Parameter::from(65), Parameter::from("BE")]
    );
    assert!(stmt.to_statement().validate().is_ok());
}

#[test]
fn continuations_do_not_affect_each_other() {
    let base = select("*").from("agent").filter("country", "UK");
    let young = base.filter("age < ?", 30);
    let old = base.filter("age > ?", 60).order_by("name");

    assert_eq!(text(&base), "SELECT * FROM agent WHERE country = ?");
    assert_eq!(text(&young), "SELECT * FROM agent WHERE country = ? AND age < ?");
    assert_eq!(
        text(&old),
        "SELECT * FROM agent WHERE country = ? AND age > ? ORDER BY name ASC"
    );
    assert_eq!(base.to_statement().params().len(), 1);
    assert_eq!(young.to_statement().params()[1], Parameter::from(30));
    assert_eq!(old.to_statement().params()[1], Parameter::from(60));
}

#[test]
fn modifiers_apply_as_a_unit() {
    let composite = CompositeWhereClause::new()
        .filter("a", 1)
        .filter_raw("b IS NULL")
        .expect("raw");
    let stmt = select("*").from("t").filter("z", 0).filter_by(&composite);
    assert_eq!(text(&stmt), "SELECT * FROM t WHERE z = ? AND a = ? AND b IS NULL");

    let keys = NamedParameterList::new()
        .with("x", 1)
        .and_then(|l| l.with("y", 2))
        .expect("keys");
    let stmt = select("*").from("t").filter_by(&keys);
    assert_eq!(text(&stmt), "SELECT * FROM t WHERE x = ? AND y = ?");
    assert_eq!(stmt.to_statement().params().len(), 2);
}

#[test]
fn group_by_and_having() {
    let stmt = select("country, count(*)")
        .from("agent")
        .filter("active", true)
        .group_by("country")
        .having("count(*) > ?", 3)
        .having_raw("country <> 'XX'")
        .expect("raw having")
        .order_by_desc("country");
    assert_eq!(
        text(&stmt),
        "SELECT country, count(*) FROM agent WHERE active = ? GROUP BY country \
         HAVING count(*) > ? AND country <> 'XX' ORDER BY country DESC"
    );
    assert_eq!(stmt.to_statement().params().len(), 2);
}

#[test]
fn order_by_lists_fields() {
    let stmt = select("*")
        .from("agent")
        .order_by("name")
        .order_by_desc("age")
        .order_by_clause(OrderByClause::asc("id"));
    assert_eq!(text(&stmt), "SELECT * FROM agent ORDER BY name ASC, age DESC, id ASC");
    assert!(!stmt.is_compound());
}

#[test]
fn only_page_uses_zero_based_pages() {
    let first = select("*").from("agent").order_by("id").only_page(0, 4);
    let third = select("*").from("agent").order_by("id").only_page(2, 4);
    assert_eq!(
        text(&first),
        "SELECT * FROM agent ORDER BY id ASC OFFSET 0 ROWS FETCH FIRST 4 ROWS ONLY"
    );
    assert_eq!(third.offset(), 8);
    assert_eq!(third.limit(), Some(4));
    assert_eq!(
        text(&select("*").from("t").order_by("id").offset_limit(5, None)),
        "SELECT * FROM t ORDER BY id ASC OFFSET 5 ROWS"
    );
}

#[test]
fn simple_page_is_materialized() {
    let limited = select("*")
        .from("agent")
        .filter("country", "UK")
        .order_by("id")
        .only_page(1, 4);
    let stmt = limited.page_statement("cnt");
    let text = stmt.text();
    assert!(text.starts_with("WITH __pgdao__"), "{text}");
    assert!(text.contains(
        " AS MATERIALIZED (SELECT * FROM agent WHERE country = ? ORDER BY id ASC) SELECT *, COUNT(*) OVER () AS cnt FROM __pgdao__"
    ));
    assert!(text.ends_with(" OFFSET 4 ROWS FETCH FIRST 4 ROWS ONLY"));
    assert_eq!(stmt.params(), &[Parameter::from("UK")]);
}

#[test]
fn intersection_of_two_branches_is_compound() {
    let uk = select("id").from("agent").filter("country", "UK");
    let old = select("id").from("agent").filter("age > ?", 60);
    let both = Intersection::new(&[&uk, &old], Arc::new(Postgres::new())).expect("two branches");

    assert!(both.is_compound());
    assert_eq!(
        text(&both),
        "(SELECT id FROM agent WHERE country = ? INTERSECT SELECT id FROM agent WHERE age > ?)"
    );
    assert_eq!(
        both.to_statement().params(),
        &[Parameter::from("UK"), Parameter::from(60)]
    );

    let ordered = both.order_by("id");
    assert!(ordered.is_compound());
    let limited = ordered.only_page(0, 10);
    assert!(limited.is_compound());

    let page = limited.page_statement("cnt");
    assert!(page.text().starts_with(
        "SELECT *, COUNT(*) OVER () AS cnt FROM ((SELECT id FROM agent WHERE country = ? \
         INTERSECT SELECT id FROM agent WHERE age > ?) ORDER BY id ASC) AS __pgdao__"
    ));
    assert_eq!(page.params().len(), 2);
}

#[test]
fn single_branch_intersection_is_the_branch() {
    let uk = select("id").from("agent").filter("country", "UK");
    let single = Intersection::new(&[&uk], Arc::new(Postgres::new())).expect("one branch");
    assert!(!single.is_compound());
    assert_eq!(text(&single), text(&uk));

    let from_branch = uk.order_by("id").only_page(0, 5).page_statement("c");
    let from_single = single.order_by("id").only_page(0, 5).page_statement("c");
    assert!(from_single.text().starts_with("WITH __pgdao__"));
    assert!(from_branch.text().starts_with("WITH __pgdao__"));
    assert_eq!(from_single.params(), from_branch.params());
}

#[test]
fn empty_intersection_is_a_usage_error() {
    let err = Intersection::new(&[], Arc::new(Postgres::new())).expect_err("no branches");
    assert!(err.is_usage());
}

#[test]
fn no_from_keeps_the_field_list() {
    let stmt = select("now() - ?::interval").parameter("1 day").no_from();
    assert_eq!(text(&stmt), "SELECT now() - ?::interval");
    assert!(stmt.to_statement().validate().is_ok());
}

#[derive(Debug, Clone)]
enum Step {
    Filter(i32),
    FilterEq(String),
    FilterRaw,
    Composite(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<i32>().prop_map(Step::Filter),
        "[a-z]{0,8}".prop_map(Step::FilterEq),
        Just(Step::FilterRaw),
        (0u8..4).prop_map(Step::Composite),
    ]
}

proptest! {
    #[test]
    fn markers_match_parameters(
        steps in prop::collection::vec(step(), 0..12),
        having in prop::collection::vec(any::<i64>(), 0..4),
        page in proptest::option::of((0u32..50, 1u32..50)),
    ) {
        let mut stmt = select("id, ? AS tag").parameter("t").from("item");
        for step in &steps {
            stmt = match step {
                Step::Filter(n) => stmt.filter("price > ?", *n),
                Step::FilterEq(s) => stmt.filter("name", s.as_str()),
                Step::FilterRaw => stmt.filter_raw("note <> '?'").expect("quoted marker"),
                Step::Composite(n) => {
                    let composite = (0..*n).fold(CompositeWhereClause::new(), |c, i| {
                        c.filter("flag", i32::from(i))
                    });
                    stmt.filter_by(&composite)
                }
            };
        }
        prop_assert!(stmt.to_statement().validate().is_ok());

        let grouped = having
            .iter()
            .fold(stmt.group_by("id"), |g, n| g.having("sum(price) > ?", *n));
        prop_assert!(grouped.to_statement().validate().is_ok());

        if let Some((nr, size)) = page {
            let limited = grouped.order_by("id").only_page(nr, size);
            prop_assert!(limited.to_statement().validate().is_ok());
            let rewritten = limited.page_statement("cnt");
            prop_assert!(rewritten.validate().is_ok());
        }
    }
}
