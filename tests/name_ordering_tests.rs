use histview::core::{compare_names, sort_names};
use proptest::prelude::*;
use std::cmp::Ordering;

#[test]
fn numeric_runs_compare_by_value() {
    assert_eq!(compare_names("A2", "A111"), Ordering::Less);
    assert_eq!(compare_names("A111", "A111"), Ordering::Equal);
    assert_eq!(compare_names("A111a", "A111b"), Ordering::Less);
    assert_eq!(compare_names("A", "AAA"), Ordering::Less);
    assert_eq!(compare_names("A111", "A2"), Ordering::Greater);
}

#[test]
fn sorting_a_sensor_list() {
    let mut names = vec!["T10", "T2", "Pressure", "T1", "T2b", "T2a"];
    sort_names(&mut names);
    assert_eq!(names, ["Pressure", "T1", "T2", "T2a", "T2b", "T10"]);
}

proptest! {
    #[test]
    fn ordering_is_antisymmetric(left in "[A-C0-9]{0,8}", right in "[A-C0-9]{0,8}") {
        prop_assert_eq!(compare_names(&left, &right), compare_names(&right, &left).reverse());
        prop_assert_eq!(compare_names(&left, &left), Ordering::Equal);
    }

    #[test]
    fn numbers_sort_numerically(left in 0u64..1_000_000, right in 0u64..1_000_000) {
        let a = format!("Ch{left}");
        let b = format!("Ch{right}");
        prop_assert_eq!(compare_names(&a, &b), left.cmp(&right));
    }
}
