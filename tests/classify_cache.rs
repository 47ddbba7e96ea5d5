use midibus::message::kinds::{AFTERTOUCH, NOTE, PROGRAM_CHANGE};
use midibus::{Catalog, Classifier, Data, Matcher, MessageType, Note, PitchBendChange};

fn every_record() -> impl Iterator<Item = Vec<u8>> {
    (0..=0xFFu8).flat_map(|status| {
        (0..0x80u8).flat_map(move |number| {
            [vec![status], vec![status, number], vec![status, number, 0x40]]
        })
    })
}

fn assert_cache_invariant(make: impl Fn() -> Classifier) {
    let mut warm = make();
    let reference = make();

    for bytes in every_record() {
        let data = Data::new(&bytes).unwrap();
        let expected = reference.scan(&data).map(|m| m.descriptor().name);

        let mut cold = make();
        let from_cold = cold.classify(&bytes, 0.0).unwrap();
        let from_warm = warm.classify(&bytes, 0.0).unwrap();

        assert_eq!(from_cold.kind(), from_warm.kind(), "{bytes:02X?}");
        assert_eq!(Some(from_warm.kind()).filter(|k| *k != "Unknown"), expected, "{bytes:02X?}");
    }
}

#[test]
fn standard_catalog_classifies_the_same_cold_and_warm() {
    assert_cache_invariant(Classifier::standard);
}

#[test]
fn overlapping_matchers_classify_the_same_cold_and_warm() {
    assert_cache_invariant(|| {
        Classifier::new(vec![
            Note::matcher_for(2, 64).unwrap(),
            Matcher::custom(&AFTERTOUCH, |d| d[1] % 3 == 0),
            PitchBendChange::matcher_on(9).unwrap(),
            Matcher::new(&NOTE),
            Matcher::custom(&PROGRAM_CHANGE, |d| d[0] & 0x0F == 4),
        ])
    });
}

#[test]
fn classifier_warms_every_nibble_once() {
    let mut classifier = Catalog::standard().classifier();
    for bytes in every_record() {
        classifier.classify(&bytes, 0.0).unwrap();
    }
    assert_eq!(classifier.cached_buckets(), 16);
}
