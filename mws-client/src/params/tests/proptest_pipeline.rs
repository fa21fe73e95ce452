use proptest::prelude::*;

use crate::params::{FlatParams, ParamValue, Parameters, StructuredList, StructuredListRegistry};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_numbering_is_one_based_and_contiguous(
        segments in prop::collection::vec("[A-Z][A-Za-z]{0,8}", 1..5),
        groups in prop::collection::vec(prop::collection::vec("[a-z0-9]{1,6}", 0..4), 0..5),
    ) {
        let list = StructuredList::new(segments.clone());
        let value = ParamValue::List(
            groups.iter().map(|g| ParamValue::from(g.clone())).collect(),
        );
        let flat = list.build(&value).unwrap();

        let expected: Vec<&String> = groups.iter().flatten().collect();
        prop_assert_eq!(flat.len(), expected.len());

        let prefix = segments.join(".");
        for (index, (key, text)) in flat.iter().enumerate() {
            prop_assert_eq!(key, &format!("{prefix}.{}", index + 1));
            prop_assert_eq!(text, expected[index]);
        }
    }

    #[test]
    fn test_scalar_is_single_element(
        segments in prop::collection::vec("[A-Z][A-Za-z]{0,8}", 1..5),
        text in "[ -~]{0,20}",
    ) {
        let flat = StructuredList::new(segments.clone()).build(&ParamValue::from(text.clone())).unwrap();
        prop_assert_eq!(flat.len(), 1);
        prop_assert_eq!(&flat[&format!("{}.1", segments.join("."))], &text);
    }

    #[test]
    fn test_pipeline_is_noop_on_flat_capitalized_keys(
        entries in prop::collection::vec(
            ("[A-Z][A-Za-z0-9]{0,10}(\\.[A-Z0-9][A-Za-z0-9]{0,5}){0,3}", "[ -~]{0,20}"),
            0..8,
        ),
    ) {
        let flat: FlatParams = entries.into_iter().collect();
        let again = Parameters::from_flat(flat.clone())
            .finalize(&StructuredListRegistry::with_defaults(), &[])
            .unwrap();
        prop_assert_eq!(again, flat);
    }
}
