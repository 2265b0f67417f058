use evstream::envelope::TryFromEnvelope;
use evstream::error::ErrorKind;

mod fixtures;

use fixtures::envelope::{recorded, recorded_as};
use fixtures::event::{BarEvent, FooEvent};

#[derive(Debug, PartialEq, TryFromEnvelope)]
enum TestGroup {
    Foo { foo: FooEvent },
    Bar(BarEvent),
}

#[test]
fn try_from_envelope_named() {
    let envelope = recorded(&FooEvent { foo: "x".into() });

    let expected = TestGroup::Foo {
        foo: FooEvent { foo: "x".into() },
    };
    let actual = TestGroup::try_from_envelope(&envelope).unwrap();

    assert_eq!(expected, actual);
}

#[test]
fn try_from_envelope_unnamed() {
    let envelope = recorded(&BarEvent(7));

    let actual = TestGroup::try_from_envelope(&envelope).unwrap();

    assert_eq!(TestGroup::Bar(BarEvent(7)), actual);
}

#[test]
fn try_from_envelope_unknown_type() {
    let envelope = recorded_as("Baz", b"{}");

    let error = TestGroup::try_from_envelope(&envelope).unwrap_err();

    assert_eq!(ErrorKind::Decoding, error.kind());
}

#[test]
fn try_from_envelope_bad_payload() {
    let envelope = recorded_as("Bar", b"\"not a number\"");

    let error = TestGroup::try_from_envelope(&envelope).unwrap_err();

    assert_eq!(ErrorKind::Decoding, error.kind());
}

#[test]
#[allow(unused)]
fn try_from_envelope_ignore() {
    #[derive(Debug, PartialEq, TryFromEnvelope)]
    enum Partial {
        Foo(FooEvent),
        #[evstream(ignore)]
        Other(i32),
    }

    let envelope = recorded(&FooEvent { foo: "y".into() });
    let actual = Partial::try_from_envelope(&envelope).unwrap();
    assert_eq!(Partial::Foo(FooEvent { foo: "y".into() }), actual);

    let envelope = recorded(&BarEvent(1));
    assert!(Partial::try_from_envelope(&envelope).is_err());
}
