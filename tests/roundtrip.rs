//! Property tests for the flatten / reform codec and the metadata line format.

use flatcorpus::codec::{ValueFormat, flatten, reform};
use flatcorpus::labeler::LabelPath;
use flatcorpus::ledger::RecordDescriptor;
use flatcorpus::reader::MetadataEntry;
use ndarray::{ArrayD, IxDyn};
use proptest::prelude::*;

fn grid() -> impl Strategy<Value = ArrayD<u8>> {
    prop::collection::vec(1usize..5, 1..4).prop_flat_map(|shape| {
        let len = shape.iter().product::<usize>();
        prop::collection::vec(any::<u8>(), len).prop_map(move |values| {
            ArrayD::from_shape_vec(IxDyn(&shape), values).unwrap()
        })
    })
}

proptest! {
    #[test]
    fn reform_inverts_flatten(sample in grid()) {
        let (shape, flat) = flatten(&sample);
        prop_assert_eq!(flat.len(), shape.iter().product::<usize>());
        prop_assert_eq!(reform(&shape, flat).unwrap(), sample);
    }

    #[test]
    fn reform_rejects_wrong_length(sample in grid(), extra in 1usize..4) {
        let (shape, mut flat) = flatten(&sample);
        flat.extend(std::iter::repeat_n(0, extra));
        prop_assert!(reform(&shape, flat).is_err());
    }

    #[test]
    fn metadata_line_parses_back(
        labels in prop::collection::vec("[a-z][a-z_]{0,6}", 1..4),
        shape in prop::collection::vec(1usize..300, 1..4),
        record in "[a-z]{1,8}/[0-9]{1,3}\\.csv",
    ) {
        let descriptor = RecordDescriptor::new(
            LabelPath::from(labels.clone()),
            shape.clone(),
            ValueFormat::Int,
            record.clone(),
        );
        let entry: MetadataEntry = descriptor.to_line().parse().unwrap();
        prop_assert_eq!(entry.labels, labels);
        prop_assert_eq!(entry.shape, shape);
        prop_assert_eq!(entry.format, ValueFormat::Int);
        prop_assert_eq!(entry.record_path, std::path::PathBuf::from(record));
    }
}
