use std::marker::PhantomData;

use evstream::envelope::EventData;
use evstream::event::Event;
use serde::Serialize;

#[test]
#[allow(unused)]
fn event() {
    #[derive(Event)]
    struct Test;

    assert_eq!("Test", Test::name());
}

#[test]
#[allow(unused)]
fn event_keeps_suffix() {
    #[derive(Event)]
    struct FooEvent;

    assert_eq!("FooEvent", FooEvent::name());
}

#[test]
#[allow(unused)]
fn event_name() {
    #[derive(Event)]
    #[evstream(name = "Custom")]
    struct TestEvent;

    assert_eq!("Custom", TestEvent::name());
}

#[test]
#[allow(unused)]
fn event_generics() {
    #[derive(Event)]
    struct TestEvent<'a, T>(PhantomData<&'a T>);

    assert_eq!("TestEvent", TestEvent::<u8>::name());
}

#[test]
fn event_enum() {
    #[derive(Event, Serialize)]
    enum OrderEvent {
        Placed { order: u32 },
    }

    let data = EventData::json(&OrderEvent::Placed { order: 1 }).unwrap();
    assert_eq!("OrderEvent", data.event_type());
}
