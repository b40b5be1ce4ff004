//! Session admission and the session arena (spec §4.1, §9).

use fnv::FnvHashMap;
use slab::Slab;
use slog::Logger;

use crate::config::AdapterConfig;
use crate::contracts::{BeginView, BufferPool, Frame, HandlerRef, IdSupplier, Router, Side};
use crate::ids::{RouteId, StreamId};

use super::app_half::AppHalf;
use super::net_half::NetHalf;

/// One `AppHalf` paired with one `NetHalf` (spec §3, "Session"). Lives in
/// the dispatcher's session arena; teardown is a single `Slab::remove`
/// once both directions have terminated.
pub struct Session {
    pub app: AppHalf,
    pub net: NetHalf,
    app_done: bool,
    net_done: bool,
}

/// Owns the session arena, the correlation table and the external
/// collaborators (spec §6): the router, the id supplier and the buffer
/// pool. Mirrors the teacher's `Endpoint`, which owns `connections:
/// Slab<Connection>` and drives admission from decoded packets.
pub struct Dispatcher {
    sessions: Slab<Session>,
    correlations: FnvHashMap<StreamId, HandlerRef>,
    router: Box<dyn Router>,
    ids: Box<dyn IdSupplier>,
    pool: Box<dyn BufferPool>,
    config: AdapterConfig,
    log: Logger,
}

impl Dispatcher {
    pub fn new(router: Box<dyn Router>, ids: Box<dyn IdSupplier>, pool: Box<dyn BufferPool>, config: AdapterConfig, log: Logger) -> Self {
        Self {
            sessions: Slab::new(),
            correlations: FnvHashMap::default(),
            router,
            ids,
            pool,
            config,
            log,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// spec §4.1 `new_stream`: admits an inbound initial Begin (route
    /// resolution, id allocation, session construction) or resolves an
    /// inbound reply Begin against the correlation table.
    ///
    /// `begin` is the already-decoded Begin frame; decoding the raw
    /// `(type_id, buffer, offset, length)` the nucleus hands the adapter
    /// is the external control-frame codec's job (spec §4.5) and happens
    /// upstream of this call.
    pub fn new_stream(&mut self, begin: BeginView) -> Option<HandlerRef> {
        if begin.stream_id.is_reply() {
            return self.correlations.remove(&begin.stream_id);
        }

        let route = self.router.resolve_app(begin.route_id, begin.auth, begin.begin_ex.as_ref())?;

        let app_reply_id = self.ids.supply_reply_id(begin.stream_id);
        let app_sink_reply = self.router.supply_receiver(app_reply_id);
        let app_sink_initial = self.router.supply_receiver(begin.stream_id);

        let net_initial_id = self.ids.supply_initial_id(route.route_id);
        let net_reply_id = self.ids.supply_reply_id(net_initial_id);
        let net_sink = self.router.supply_receiver(net_initial_id);

        let entry = self.sessions.vacant_entry();
        let key = entry.key();

        let app_log = self.log.new(o!("session" => key, "side" => "app", "initial_id" => begin.stream_id.0));
        let net_log = self.log.new(o!("session" => key, "side" => "net", "initial_id" => net_initial_id.0));

        let app = AppHalf::new(begin.stream_id, app_reply_id, app_sink_reply, app_sink_initial, app_log);
        let net = NetHalf::new(net_initial_id, net_reply_id, net_sink, net_log);

        entry.insert(Session {
            app,
            net,
            app_done: false,
            net_done: false,
        });

        self.router.set_throttle(app_reply_id, HandlerRef { session: key, side: Side::App });
        self.router.set_throttle(net_initial_id, HandlerRef { session: key, side: Side::Net });

        let session = &mut self.sessions[key];
        let begun = session.net.do_net_begin(
            begin.trace,
            begin.auth,
            begin.affinity,
            begin.begin_ex.as_ref(),
            &mut *self.pool,
            &mut self.correlations,
            &self.config,
            key,
        );

        match begun {
            Ok(()) => Some(HandlerRef { session: key, side: Side::App }),
            Err(err) => {
                warn!(self.log, "PROXY v2 header encoding failed, dropping session"; "error" => %err);
                self.sessions.remove(key);
                None
            }
        }
    }

    /// Routes an already-decoded frame to the half named by `handler`
    /// (spec §4.2/§4.3's per-frame dispatch tables), then tears the
    /// session down once both directions have reported a terminal frame
    /// (spec §3: "destroyed when both directions have terminated").
    pub fn dispatch(&mut self, handler: HandlerRef, frame: Frame) {
        let key = handler.session;
        let terminal = is_terminal(&frame);

        let session = match self.sessions.get_mut(key) {
            Some(session) => session,
            None => return,
        };
        let Session { app, net, app_done, net_done } = session;

        match handler.side {
            Side::App => {
                app.on_app_message(frame, net, &mut *self.pool, &mut self.correlations, &self.config);
                if terminal {
                    *app_done = true;
                }
            }
            Side::Net => {
                net.on_net_message(frame, app, &mut *self.pool, &mut self.correlations, &self.config);
                if terminal {
                    *net_done = true;
                }
            }
        }

        if self.sessions[key].app_done && self.sessions[key].net_done {
            debug!(self.log, "session torn down"; "session" => key);
            self.sessions.remove(key);
        }
    }
}

fn is_terminal(frame: &Frame) -> bool {
    matches!(frame, Frame::End(_) | Frame::Abort(_) | Frame::Reset(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::testing::{Sent, TestBufferPool, TestIdSupplier, TestRouter};
    use crate::contracts::WindowView;
    use crate::proxy::{AddressTuple, BeginEx, TransportProtocol};
    use std::net::Ipv4Addr;

    fn test_log() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn new_dispatcher() -> (Dispatcher, std::rc::Rc<std::cell::RefCell<std::collections::HashMap<StreamId, Vec<Sent>>>>) {
        let router = TestRouter::new();
        let log_handle = router.log.clone();
        let ids = TestIdSupplier::starting_at(101);
        let pool = TestBufferPool::new();
        let dispatcher = Dispatcher::new(Box::new(router), Box::new(ids), Box::new(pool), AdapterConfig::default(), test_log());
        (dispatcher, log_handle)
    }

    #[test]
    fn local_command_scenario_flushes_on_sufficient_window() {
        let (mut dispatcher, log) = new_dispatcher();

        let handler = dispatcher
            .new_stream(BeginView {
                stream_id: StreamId(1),
                route_id: RouteId(7),
                auth: 0,
                trace: 0,
                affinity: 0,
                begin_ex: None,
            })
            .expect("route resolves");

        let net_handler = HandlerRef { session: handler.session, side: Side::Net };
        dispatcher.dispatch(
            net_handler,
            Frame::Window(WindowView {
                stream_id: StreamId(102),
                credit: 64,
                padding: 0,
            }),
        );

        let sent = log.borrow().get(&StreamId(101)).cloned().unwrap_or_default();
        assert_eq!(sent.len(), 2, "expected Begin then Data, got {:?}", sent);
        assert!(matches!(sent[0], Sent::Begin { .. }));
        match &sent[1] {
            Sent::Data { reserved, flags, payload } => {
                assert_eq!(*reserved, 16);
                assert_eq!(*flags, 0x03);
                assert_eq!(
                    payload.as_slice(),
                    &[0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, b'Q', b'U', b'I', b'T', 0x0A, 0x20, 0x00, 0x00, 0x00]
                );
            }
            other => panic!("expected Data, got {:?}", other),
        }
    }

    #[test]
    fn window_granting_less_than_header_leaves_slot_held() {
        let (mut dispatcher, log) = new_dispatcher();
        let handler = dispatcher
            .new_stream(BeginView {
                stream_id: StreamId(1),
                route_id: RouteId(7),
                auth: 0,
                trace: 0,
                affinity: 0,
                begin_ex: None,
            })
            .unwrap();

        let net_handler = HandlerRef { session: handler.session, side: Side::Net };
        dispatcher.dispatch(
            net_handler,
            Frame::Window(WindowView {
                stream_id: StreamId(102),
                credit: 8,
                padding: 0,
            }),
        );

        let sent = log.borrow().get(&StreamId(101)).cloned().unwrap_or_default();
        assert_eq!(sent.len(), 1, "no Data should have been emitted yet: {:?}", sent);
        assert!(matches!(sent[0], Sent::Begin { .. }));
    }

    #[test]
    fn proxy_inet_scenario_end_to_end() {
        let (mut dispatcher, log) = new_dispatcher();
        let begin_ex = BeginEx::new(AddressTuple::Inet4 {
            source: Ipv4Addr::new(10, 0, 0, 1),
            dest: Ipv4Addr::new(10, 0, 0, 2),
            source_port: 1111,
            dest_port: 80,
            protocol: TransportProtocol::Stream,
        });
        let handler = dispatcher
            .new_stream(BeginView {
                stream_id: StreamId(1),
                route_id: RouteId(7),
                auth: 0,
                trace: 0,
                affinity: 0,
                begin_ex: Some(begin_ex),
            })
            .unwrap();

        let net_handler = HandlerRef { session: handler.session, side: Side::Net };
        dispatcher.dispatch(
            net_handler,
            Frame::Window(WindowView {
                stream_id: StreamId(102),
                credit: 64,
                padding: 0,
            }),
        );

        let sent = log.borrow().get(&StreamId(101)).cloned().unwrap_or_default();
        match &sent[1] {
            Sent::Data { reserved, payload, .. } => {
                assert_eq!(*reserved, 28);
                assert_eq!(payload.len(), 28);
                assert_eq!(payload[12], 0x21);
            }
            other => panic!("expected Data, got {:?}", other),
        }
    }

    #[test]
    fn budget_violation_resets_app_and_aborts_net() {
        let (mut dispatcher, log) = new_dispatcher();
        let handler = dispatcher
            .new_stream(BeginView {
                stream_id: StreamId(1),
                route_id: RouteId(7),
                auth: 0,
                trace: 0,
                affinity: 0,
                begin_ex: None,
            })
            .unwrap();

        // An upstream Window of 66 flushes the 16-byte LOCAL header (spec
        // scenario 1), leaving 50 bytes of net-side `initial_budget`; the
        // budget reconciliation in `do_app_window` (spec §4.2) hands the
        // app exactly that 50 bytes of credit, matching spec §8 scenario 5.
        let net_handler = HandlerRef { session: handler.session, side: Side::Net };
        dispatcher.dispatch(
            net_handler,
            Frame::Window(WindowView {
                stream_id: StreamId(102),
                credit: 66,
                padding: 0,
            }),
        );

        dispatcher.dispatch(
            handler,
            Frame::Data(crate::contracts::DataView {
                stream_id: StreamId(1),
                reserved: 100,
                flags: 0,
                payload: bytes::Bytes::new(),
            }),
        );

        let app_sent = log.borrow().get(&StreamId(1)).cloned().unwrap_or_default();
        assert!(
            app_sent.iter().any(|s| matches!(s, Sent::Reset)),
            "expected a Reset toward the app: {:?}",
            app_sent
        );
        let net_sent = log.borrow().get(&StreamId(101)).cloned().unwrap_or_default();
        assert!(
            net_sent.iter().any(|s| matches!(s, Sent::Abort)),
            "expected an Abort toward net: {:?}",
            net_sent
        );
    }

    #[test]
    fn reply_correlation_consumed_exactly_once() {
        let (mut dispatcher, _log) = new_dispatcher();
        let handler = dispatcher
            .new_stream(BeginView {
                stream_id: StreamId(1),
                route_id: RouteId(7),
                auth: 0,
                trace: 0,
                affinity: 0,
                begin_ex: None,
            })
            .unwrap();

        // Net half's own reply id was derived from StreamId(101) (the
        // allocated net initial id), i.e. the fixture's XOR-low-bit rule.
        let net_reply_id = StreamId(101 ^ 1);
        let resolved = dispatcher.new_stream(BeginView {
            stream_id: net_reply_id,
            route_id: RouteId(0),
            auth: 0,
            trace: 0,
            affinity: 0,
            begin_ex: None,
        });
        assert_eq!(resolved, Some(HandlerRef { session: handler.session, side: Side::Net }));

        let resolved_again = dispatcher.new_stream(BeginView {
            stream_id: net_reply_id,
            route_id: RouteId(0),
            auth: 0,
            trace: 0,
            affinity: 0,
            begin_ex: None,
        });
        assert_eq!(resolved_again, None, "correlation entry must be consumed exactly once");
    }

    #[test]
    fn no_route_returns_none() {
        let router = TestRouter { deny: Some(RouteId(7)), ..TestRouter::new() };
        let ids = TestIdSupplier::starting_at(101);
        let pool = TestBufferPool::new();
        let mut dispatcher = Dispatcher::new(Box::new(router), Box::new(ids), Box::new(pool), AdapterConfig::default(), test_log());

        let resolved = dispatcher.new_stream(BeginView {
            stream_id: StreamId(1),
            route_id: RouteId(7),
            auth: 0,
            trace: 0,
            affinity: 0,
            begin_ex: None,
        });
        assert!(resolved.is_none());
        assert_eq!(dispatcher.session_count(), 0);
    }

    #[test]
    fn session_torn_down_once_both_directions_terminate() {
        let (mut dispatcher, _log) = new_dispatcher();
        let handler = dispatcher
            .new_stream(BeginView {
                stream_id: StreamId(1),
                route_id: RouteId(7),
                auth: 0,
                trace: 0,
                affinity: 0,
                begin_ex: None,
            })
            .unwrap();
        assert_eq!(dispatcher.session_count(), 1);

        dispatcher.dispatch(handler, Frame::End(crate::contracts::EndView { stream_id: StreamId(1) }));
        assert_eq!(dispatcher.session_count(), 1, "still waiting on the net direction");

        let net_handler = HandlerRef { session: handler.session, side: Side::Net };
        dispatcher.dispatch(net_handler, Frame::End(crate::contracts::EndView { stream_id: StreamId(101) }));
        assert_eq!(dispatcher.session_count(), 0);
    }
}
