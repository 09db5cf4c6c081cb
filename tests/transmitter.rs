mod tests {
    use core::future::pending;

    use embassy_futures::block_on;
    use embassy_time::{Duration, Instant};
    use myrtio_artnet_bridge::{CycleReport, DmxTimings, DmxTransmitter, DmxUart, FrameStore};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Break,
        Mark,
        Data,
    }

    /// Records line events and written frames
    #[derive(Default)]
    struct MockUart<'a> {
        events: Vec<(Event, Instant)>,
        frames: Vec<Vec<u8>>,
        busy: bool,
        fail_writes: bool,
        fail_invert: bool,
        /// Number of upcoming restore calls that fail
        restore_failures: usize,
        line_inverted: bool,
        /// Channel write issued while the next frame is on the wire
        write_during_tx: Option<(&'a FrameStore, u16, u8)>,
    }

    impl DmxUart for MockUart<'_> {
        type Error = &'static str;

        async fn wait_tx_done(&mut self) -> Result<(), Self::Error> {
            if self.busy {
                pending::<()>().await;
            }
            Ok(())
        }

        fn set_line_inverted(&mut self, inverted: bool) -> Result<(), Self::Error> {
            if inverted && self.fail_invert {
                return Err("line control unavailable");
            }
            if !inverted && self.restore_failures > 0 {
                self.restore_failures -= 1;
                return Err("line stuck");
            }
            self.line_inverted = inverted;
            let event = if inverted { Event::Break } else { Event::Mark };
            self.events.push((event, Instant::now()));
            Ok(())
        }

        async fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.events.push((Event::Data, Instant::now()));
            if let Some((store, channel, value)) = self.write_during_tx.take() {
                store.write_single(channel, value).await.unwrap();
            }
            if self.fail_writes {
                return Err("tx fifo overflow");
            }
            self.frames.push(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_default_timings_are_compliant() {
        let timings = DmxTimings::default();
        assert!(timings.is_compliant());
        assert_eq!(timings.break_time, Duration::from_micros(184));
        assert_eq!(timings.mark_after_break, Duration::from_micros(24));
        assert_eq!(timings.frame_interval, Duration::from_millis(50));
        assert_eq!(timings.drain_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_non_compliant_timings() {
        let short_break = DmxTimings {
            break_time: Duration::from_micros(88),
            ..DmxTimings::DEFAULT
        };
        assert!(!short_break.is_compliant());

        let short_mark = DmxTimings {
            mark_after_break: Duration::from_micros(8),
            ..DmxTimings::DEFAULT
        };
        assert!(!short_mark.is_compliant());

        let too_fast = DmxTimings {
            frame_interval: Duration::from_millis(10),
            ..DmxTimings::DEFAULT
        };
        assert!(!too_fast.is_compliant());

        let too_slow = DmxTimings {
            frame_interval: Duration::from_secs(2),
            ..DmxTimings::DEFAULT
        };
        assert!(!too_slow.is_compliant());
    }

    #[test]
    fn test_break_and_mark_timing() {
        let store = FrameStore::new();
        let mut tx = DmxTransmitter::new(MockUart::default(), &store);

        for _ in 0..5 {
            let report = block_on(tx.tick());
            assert!(report.transmitted);
        }

        let events = &tx.uart().events;
        assert_eq!(events.len(), 15);
        for cycle in events.chunks(3) {
            let [(Event::Break, brk), (Event::Mark, mark), (Event::Data, data)] = cycle else {
                panic!("unexpected event order: {:?}", cycle);
            };
            assert!(mark.duration_since(*brk) >= DmxTimings::MIN_BREAK);
            assert!(mark.duration_since(*brk) >= Duration::from_micros(184));
            assert!(data.duration_since(*mark) >= DmxTimings::MIN_MARK_AFTER_BREAK);
            assert!(data.duration_since(*mark) >= Duration::from_micros(24));
        }
    }

    #[test]
    fn test_sends_start_code_and_all_channels() {
        let store = FrameStore::new();
        let mut tx = DmxTransmitter::new(MockUart::default(), &store);

        let report = block_on(tx.tick());
        assert_eq!(
            report,
            CycleReport {
                drained: true,
                swapped: false,
                transmitted: true
            }
        );
        assert_eq!(tx.uart().frames, vec![vec![0; 513]]);
    }

    #[test]
    fn test_pending_writes_swapped_in_before_transmission() {
        let store = FrameStore::new();
        let mut tx = DmxTransmitter::new(MockUart::default(), &store);

        block_on(store.write(1, &[10, 20, 30])).unwrap();
        let report = block_on(tx.tick());
        assert!(report.swapped);

        let sent = &tx.uart().frames[0];
        assert_eq!(&sent[..5], &[0, 10, 20, 30, 0]);
        assert_eq!(tx.frame().channel(3), Some(30));

        // Retransmitted unchanged without new writes
        let report = block_on(tx.tick());
        assert!(!report.swapped);
        assert_eq!(tx.uart().frames[1], tx.uart().frames[0]);
    }

    #[test]
    fn test_write_during_transmission_waits_for_next_cycle() {
        let store = FrameStore::new();
        let mut tx = DmxTransmitter::new(MockUart::default(), &store);

        block_on(store.write_single(1, 10)).unwrap();
        tx.uart_mut().write_during_tx = Some((&store, 1, 99));

        block_on(tx.tick());
        assert_eq!(tx.uart().frames[0][1], 10);

        let report = block_on(tx.tick());
        assert!(report.swapped);
        assert_eq!(tx.uart().frames[1][1], 99);
        assert_eq!(tx.uart().frames[1][0], 0);
    }

    #[test]
    fn test_busy_uart_skips_cycle() {
        let store = FrameStore::new();
        let timings = DmxTimings {
            drain_timeout: Duration::from_millis(5),
            ..DmxTimings::DEFAULT
        };
        let uart = MockUart {
            busy: true,
            ..MockUart::default()
        };
        let mut tx = DmxTransmitter::with_timings(uart, &store, timings);

        block_on(store.write_single(1, 10)).unwrap();
        assert_eq!(block_on(tx.tick()), CycleReport::default());
        assert!(tx.uart().events.is_empty());
        // The pending write is still waiting for a cycle that gets through
        assert_eq!(block_on(store.is_swap_pending()), Ok(true));

        tx.uart_mut().busy = false;
        let report = block_on(tx.tick());
        assert!(report.swapped && report.transmitted);
        assert_eq!(tx.uart().frames[0][1], 10);
    }

    #[test]
    fn test_write_error_is_not_fatal() {
        let store = FrameStore::new();
        let uart = MockUart {
            fail_writes: true,
            ..MockUart::default()
        };
        let mut tx = DmxTransmitter::new(uart, &store);

        let report = block_on(tx.tick());
        assert!(report.drained);
        assert!(!report.transmitted);

        tx.uart_mut().fail_writes = false;
        assert!(block_on(tx.tick()).transmitted);
    }

    #[test]
    fn test_restore_is_retried() {
        let store = FrameStore::new();
        let uart = MockUart {
            restore_failures: 1,
            ..MockUart::default()
        };
        let mut tx = DmxTransmitter::new(uart, &store);

        let report = block_on(tx.tick());
        assert!(report.transmitted);
        assert!(!tx.uart().line_inverted);
    }

    #[test]
    fn test_stuck_line_skips_frame() {
        let store = FrameStore::new();
        let uart = MockUart {
            restore_failures: 2,
            ..MockUart::default()
        };
        let mut tx = DmxTransmitter::new(uart, &store);

        let report = block_on(tx.tick());
        assert!(report.drained);
        assert!(!report.transmitted);
        assert!(tx.uart().frames.is_empty());

        // The next cycle restores the line and recovers
        assert!(block_on(tx.tick()).transmitted);
        assert!(!tx.uart().line_inverted);
        assert_eq!(tx.uart().frames.len(), 1);
    }

    #[test]
    fn test_failed_break_still_restores_line() {
        let store = FrameStore::new();
        let uart = MockUart {
            fail_invert: true,
            ..MockUart::default()
        };
        let mut tx = DmxTransmitter::new(uart, &store);

        assert!(!block_on(tx.tick()).transmitted);
        assert!(tx.uart().frames.is_empty());
        let events = &tx.uart().events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Event::Mark);
    }
}
