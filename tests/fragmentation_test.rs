use meshcore::frag;
use std::time::Duration;

#[test]
fn two_thousand_byte_datagram_round_trips_over_thirty_byte_link() {
    let data: Vec<u8> = (0..2000u32).map(|i| (i % 256) as u8).collect();
    let frames = frag::fragment(5, &data).expect("2000 bytes fits within MAX_FRAGMENTS");
    assert_eq!(frames.len(), 2000usize.div_ceil(30));

    let mut pool = frag::ReassemblyPool::new(5, Duration::from_millis(5_000));
    let mut reassembled = None;
    for frame in &frames {
        if let Some(out) = pool.receive(frame) {
            reassembled = Some(out);
        }
    }

    let reassembled = reassembled.expect("all fragments delivered in order");
    assert_eq!(&reassembled[..data.len()], &data[..]);
}

#[test]
fn oversized_datagram_is_rejected_before_any_frame_is_built() {
    let data = vec![0u8; 30 * 129]; // one more fragment than MAX_FRAGMENTS allows
    assert!(frag::fragment(0, &data).is_none());
}
