use crate::buffer::HistoryBuffer;

#[test]
fn push_drops_oldest_on_overflow() {
    let mut buffer = HistoryBuffer::new(3);
    for value in 1..=5 {
        buffer.push(value);
    }

    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.to_vec(), vec![3, 4, 5]);
    assert_eq!(buffer.last(), Some(&5));
}

#[test]
fn replace_keeps_newest_entries() {
    let mut buffer = HistoryBuffer::new(4);
    buffer.push(100);

    buffer.replace(0..10);

    assert_eq!(buffer.to_vec(), vec![6, 7, 8, 9]);
    assert_eq!(buffer.capacity(), 4);
}

#[test]
fn serializes_as_sequence() {
    let mut buffer = HistoryBuffer::new(2);
    buffer.push(1.5);
    buffer.push(2.5);

    assert_eq!(serde_json::to_string(&buffer).unwrap(), "[1.5,2.5]");
}
