//! Link flow state

use oxamqp_types::{definitions::SequenceNo, performatives::Flow};

use super::SendError;

const SERIAL_HALF: u32 = 1 << 31;

/// Flow state of the sending end of a link.
///
/// Credit is only ever set from the receiver's flow and consumed one unit
/// per delivery, so it can never go below zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderFlowState {
    initial_delivery_count: SequenceNo,
    delivery_count: SequenceNo,
    link_credit: u32,
    drain: bool,
}

impl SenderFlowState {
    /// Creates the flow state announced in the attach
    pub fn new(initial_delivery_count: SequenceNo) -> Self {
        Self {
            initial_delivery_count,
            delivery_count: initial_delivery_count,
            link_credit: 0,
            drain: false,
        }
    }

    /// Delivery count announced in the attach
    pub fn initial_delivery_count(&self) -> SequenceNo {
        self.initial_delivery_count
    }

    /// Number of deliveries sent so far, starting from the initial delivery count
    pub fn delivery_count(&self) -> SequenceNo {
        self.delivery_count
    }

    /// Current link credit
    pub fn link_credit(&self) -> u32 {
        self.link_credit
    }

    /// Whether the receiver asked the sender to use up its credit
    pub fn drain(&self) -> bool {
        self.drain
    }

    /// Whether a delivery may be sent
    pub fn can_send(&self) -> bool {
        self.link_credit > 0
    }

    /// Takes one unit of credit for a delivery
    pub fn consume(&mut self) -> Result<(), SendError> {
        if self.link_credit == 0 {
            return Err(SendError::InsufficientCredit);
        }
        self.link_credit -= 1;
        self.delivery_count = self.delivery_count.wrapping_add(1);
        Ok(())
    }

    /// Handles incoming Flow frame
    ///
    /// Returns whether the receiver asked for the link state to be echoed
    pub fn on_incoming_flow(&mut self, flow: &Flow) -> bool {
        // link-credit_snd := delivery-count_rcv + link-credit_rcv - delivery-count_snd.
        //
        // A receiver that does not know the delivery count yet counts from the
        // initial delivery count of the attach.
        let delivery_count_rcv = flow.delivery_count.unwrap_or(self.initial_delivery_count);
        if let Some(link_credit_rcv) = flow.link_credit {
            // Deliveries the receiver has not counted yet. A receiver count
            // ahead of ours (in serial number order) grants nothing.
            let in_flight = self.delivery_count.wrapping_sub(delivery_count_rcv);
            self.link_credit = if in_flight > SERIAL_HALF {
                0
            } else {
                link_credit_rcv.saturating_sub(in_flight)
            };
        }
        self.drain = flow.drain;
        flow.echo
    }

    /// Uses up the remaining credit after a drain request.
    ///
    /// Returns false if there was no pending drain.
    pub fn drained(&mut self) -> bool {
        if !self.drain {
            return false;
        }
        self.delivery_count = self.delivery_count.wrapping_add(self.link_credit);
        self.link_credit = 0;
        self.drain = false;
        true
    }

    /// Fills the link fields of a flow
    pub fn write_to(&self, flow: &mut Flow) {
        flow.delivery_count = Some(self.delivery_count);
        flow.link_credit = Some(self.link_credit);
        flow.available = Some(0);
        flow.drain = self.drain;
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_types::{definitions::Handle, performatives::Flow};

    use crate::link::SendError;

    use super::SenderFlowState;

    fn flow(delivery_count: Option<u32>, link_credit: u32) -> Flow {
        Flow {
            handle: Some(Handle(0)),
            delivery_count,
            link_credit: Some(link_credit),
            ..Default::default()
        }
    }

    #[test]
    fn each_send_takes_one_credit() {
        let mut state = SenderFlowState::new(0);
        state.on_incoming_flow(&flow(Some(0), 3));
        for expected in (0..3).rev() {
            state.consume().unwrap();
            assert_eq!(state.link_credit(), expected);
        }
        assert_eq!(state.delivery_count(), 3);
        assert!(!state.can_send());
        assert!(matches!(state.consume(), Err(SendError::InsufficientCredit)));
        assert_eq!(state.link_credit(), 0);
    }

    #[test]
    fn flow_sets_absolute_credit() {
        let mut state = SenderFlowState::new(0);
        state.on_incoming_flow(&flow(Some(0), 5));
        state.consume().unwrap();
        state.consume().unwrap();

        // The receiver has seen both deliveries and grants 10
        state.on_incoming_flow(&flow(Some(2), 10));
        assert_eq!(state.link_credit(), 10);

        // A repeated announcement does not add up
        state.on_incoming_flow(&flow(Some(2), 10));
        assert_eq!(state.link_credit(), 10);
    }

    #[test]
    fn stale_flow_accounts_for_deliveries_in_flight() {
        let mut state = SenderFlowState::new(0);
        state.on_incoming_flow(&flow(None, 2));
        state.consume().unwrap();
        state.consume().unwrap();

        // The receiver has not seen the deliveries yet
        state.on_incoming_flow(&flow(Some(0), 1));
        assert_eq!(state.link_credit(), 0);
        state.on_incoming_flow(&flow(Some(0), 5));
        assert_eq!(state.link_credit(), 3);
    }

    #[test]
    fn delivery_count_wraps() {
        let mut state = SenderFlowState::new(u32::MAX);
        state.on_incoming_flow(&flow(Some(u32::MAX), 2));
        state.consume().unwrap();
        assert_eq!(state.delivery_count(), 0);
        assert_eq!(state.link_credit(), 1);
        state.on_incoming_flow(&flow(Some(0), 4));
        assert_eq!(state.link_credit(), 4);
    }

    #[test]
    fn large_grants_are_kept() {
        let mut state = SenderFlowState::new(0);
        state.on_incoming_flow(&flow(Some(0), u32::MAX));
        assert_eq!(state.link_credit(), u32::MAX);

        state.on_incoming_flow(&flow(Some(0), 0x8000_0000));
        assert_eq!(state.link_credit(), 0x8000_0000);

        state.consume().unwrap();
        state.on_incoming_flow(&flow(Some(0), u32::MAX));
        assert_eq!(state.link_credit(), u32::MAX - 1);
    }

    #[test]
    fn receiver_count_ahead_grants_nothing() {
        let mut state = SenderFlowState::new(10);
        state.on_incoming_flow(&flow(Some(20), 5));
        assert_eq!(state.link_credit(), 0);
    }

    #[test]
    fn drain_consumes_remaining_credit() {
        let mut state = SenderFlowState::new(0);
        let mut drain = flow(Some(0), 4);
        drain.drain = true;
        drain.echo = true;
        assert!(state.on_incoming_flow(&drain));
        assert!(state.drain());
        state.consume().unwrap();

        assert!(state.drained());
        assert_eq!(state.link_credit(), 0);
        assert_eq!(state.delivery_count(), 4);
        assert!(!state.drained());

        let mut reply = Flow::default();
        state.write_to(&mut reply);
        assert_eq!(reply.delivery_count, Some(4));
        assert_eq!(reply.link_credit, Some(0));
    }
}
