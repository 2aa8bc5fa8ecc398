use servir::buffer::Buffer;
use std::io::Cursor;

#[test]
fn test_buffer_creation() {
    let buffer = Buffer::new(1024);
    assert_eq!(buffer.capacity(), 1024);
    assert_eq!(buffer.available_data(), 0);
    assert_eq!(buffer.remaining_capacity(), 1024);
}

#[test]
fn test_append_and_slice() {
    let mut buffer = Buffer::new(64);
    buffer.write(b"hello ");
    buffer.write(b"world");

    assert_eq!(buffer.available_data(), 11);
    assert_eq!(buffer.slice(), b"hello world");
}

#[test]
fn test_append_grows_past_initial_capacity() {
    let mut buffer = Buffer::new(4);
    buffer.write(b"this does not fit in four bytes");

    assert_eq!(buffer.slice(), b"this does not fit in four bytes");
    assert!(buffer.capacity() >= 31);
}

#[test]
fn test_fill_from_respects_max() {
    let mut source = Cursor::new(vec![7u8; 100]);
    let mut buffer = Buffer::new(128);

    let n = buffer.fill_from(&mut source, 10).unwrap();
    assert_eq!(n, 10);
    assert_eq!(buffer.available_data(), 10);
    assert_eq!(buffer.slice(), &[7u8; 10][..]);
}

#[test]
fn test_fill_from_exhausted_reader_returns_zero() {
    let mut source = Cursor::new(vec![1u8, 2, 3]);
    let mut buffer = Buffer::new(16);

    assert_eq!(buffer.fill_from(&mut source, 16).unwrap(), 3);
    assert_eq!(buffer.fill_from(&mut source, 16).unwrap(), 0);
    assert_eq!(buffer.slice(), &[1, 2, 3]);
}

#[test]
fn test_read_from_reader() {
    let mut source = Cursor::new(b"request bytes".to_vec());
    let mut buffer = Buffer::new(64);

    let n = buffer.read_from(&mut source).unwrap();
    assert_eq!(n, 13);
    assert_eq!(buffer.slice(), b"request bytes");
}

#[test]
fn test_write_to_drains_the_buffer() {
    let mut buffer = Buffer::new(64);
    buffer.write(b"response body");

    let mut sink = Vec::new();
    let n = buffer.write_to(&mut sink).unwrap();

    assert_eq!(n, 13);
    assert_eq!(sink, b"response body");
    assert_eq!(buffer.available_data(), 0);
}

#[test]
fn test_write_to_empty_buffer_is_a_noop() {
    let mut buffer = Buffer::new(64);
    let mut sink = Vec::new();
    assert_eq!(buffer.write_to(&mut sink).unwrap(), 0);
    assert!(sink.is_empty());
}

#[test]
fn test_fully_drained_buffer_resets_cursors() {
    let mut buffer = Buffer::new(8);
    buffer.write(b"abcd");

    let mut sink = Vec::new();
    buffer.write_to(&mut sink).unwrap();

    // After draining everything the write cursor returns to the front, so
    // the full capacity is usable again without growing.
    assert_eq!(buffer.remaining_capacity(), buffer.capacity());

    buffer.write(b"efghijkl");
    assert_eq!(buffer.capacity(), 8);
    assert_eq!(buffer.slice(), b"efghijkl");
}

#[test]
fn test_partial_write_keeps_the_rest_pending() {
    struct TwoBytesAtATime(Vec<u8>);

    impl std::io::Write for TwoBytesAtATime {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(2);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut buffer = Buffer::new(16);
    buffer.write(b"abcdef");

    let mut sink = TwoBytesAtATime(Vec::new());
    assert_eq!(buffer.write_to(&mut sink).unwrap(), 2);
    assert_eq!(buffer.available_data(), 4);
    assert_eq!(buffer.slice(), b"cdef");

    while buffer.available_data() > 0 {
        buffer.write_to(&mut sink).unwrap();
    }
    assert_eq!(sink.0, b"abcdef");
}

#[test]
fn test_compaction_reclaims_consumed_space() {
    struct OneByte;

    impl std::io::Write for OneByte {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut buffer = Buffer::new(8);
    buffer.write(b"abcdefgh");
    buffer.write_to(&mut OneByte).unwrap();
    assert_eq!(buffer.slice(), b"bcdefgh");

    // Appending one more byte fits after compacting the consumed prefix.
    buffer.write(b"i");
    assert_eq!(buffer.capacity(), 8);
    assert_eq!(buffer.slice(), b"bcdefghi");
}

#[test]
fn test_reset_discards_pending_data() {
    let mut buffer = Buffer::new(32);
    buffer.write(b"stale response");
    buffer.reset();

    assert_eq!(buffer.available_data(), 0);
    buffer.write(b"fresh");
    assert_eq!(buffer.slice(), b"fresh");
}

#[test]
fn test_interleaved_fill_and_drain() {
    let mut buffer = Buffer::new(32);
    let mut sink = Vec::new();

    let mut first = Cursor::new(b"chunk one ".to_vec());
    buffer.fill_from(&mut first, 64).unwrap();
    buffer.write_to(&mut sink).unwrap();

    let mut second = Cursor::new(b"chunk two".to_vec());
    buffer.fill_from(&mut second, 64).unwrap();
    buffer.write_to(&mut sink).unwrap();

    assert_eq!(sink, b"chunk one chunk two");
}
