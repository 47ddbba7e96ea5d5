use std::alloc::System;

use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};

use midibus::{Classifier, Record};

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

#[test]
fn warm_classification_does_not_allocate() {
    let mut classifier = Classifier::standard();

    // Warm up: fill every nibble bucket, including the Unknown path.
    for status in 0..=0xFFu8 {
        classifier.classify(&[status, 0, 0], 0.0).unwrap();
        classifier.classify(&[status, 120], 0.0).unwrap();
        classifier.classify(&[status], 0.0).unwrap();
    }
    assert_eq!(classifier.cached_buckets(), 16);

    let records: Vec<Record> = (0..=0xFFu8)
        .map(|status| Record::new(&[status, status & 0x7F, 1], f64::from(status)).unwrap())
        .collect();

    let region = Region::new(GLOBAL);
    let mut notes = 0usize;
    for record in &records {
        if classifier.build(*record).kind() == "Note" {
            notes += 1;
        }
    }
    let stats = region.change();

    assert_eq!(notes, 32);
    assert_eq!(stats.allocations, 0, "warm classification allocated: {stats:?}");
    assert_eq!(stats.reallocations, 0, "warm classification reallocated: {stats:?}");
}
