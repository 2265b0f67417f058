use evstream::envelope::{EventData, RecordedEvent};
use evstream::event::Event;
use serde::Serialize;

pub fn recorded<E: Event + Serialize>(event: &E) -> RecordedEvent {
    let data = EventData::json(event).unwrap();
    RecordedEvent::new("fixtures", 0, data)
}

#[allow(dead_code)]
pub fn recorded_as(event_type: &str, payload: &[u8]) -> RecordedEvent {
    let data = EventData::from_parts(None, event_type, payload.to_vec(), Vec::new());
    RecordedEvent::new("fixtures", 0, data)
}
