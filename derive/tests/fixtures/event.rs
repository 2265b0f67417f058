use evstream::event::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct FooEvent {
    pub foo: String,
}

#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct BarEvent(pub u32);

impl Event for FooEvent {
    fn name() -> &'static str {
        "Foo"
    }
}

impl Event for BarEvent {
    fn name() -> &'static str {
        "Bar"
    }
}
