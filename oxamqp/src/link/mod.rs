//! Implements the sending end of a link

use std::collections::BTreeMap;

use oxamqp_types::{
    definitions::{self, AmqpError, DeliveryTag, Handle, ReceiverSettleMode, Role, SenderSettleMode},
    messaging::{Source, Target},
    performatives::{Attach, Detach, Flow},
    states::LinkState,
};

use crate::Error;

mod delivery;
mod error;
mod state;

pub use delivery::{DeliveryStatus, DeliveryTagGenerator, DeliveryUpdate};
pub(crate) use delivery::UnsettledDelivery;
pub use error::SendError;
pub use state::SenderFlowState;

/// Identifies a link of a [`ConnectionEngine`](crate::ConnectionEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkHandle {
    pub(crate) session: usize,
    pub(crate) link: usize,
}

impl LinkHandle {
    /// The session the link belongs to
    pub fn session(&self) -> crate::session::SessionHandle {
        crate::session::SessionHandle(self.session)
    }
}

/// The sending end of a link
#[derive(Debug)]
pub(crate) struct SenderLink {
    pub name: String,
    pub state: LinkState,
    pub output_handle: Handle,
    pub input_handle: Option<Handle>,

    pub source: Source,
    pub target: Target,
    pub snd_settle_mode: SenderSettleMode,
    pub rcv_settle_mode: ReceiverSettleMode,
    pub max_message_size: Option<u64>,

    pub flow_state: SenderFlowState,
    pub tag_generator: DeliveryTagGenerator,
    pub unsettled: BTreeMap<DeliveryTag, UnsettledDelivery>,

    pub local_error: Option<definitions::Error>,
    pub remote_error: Option<definitions::Error>,
}

impl SenderLink {
    pub fn new(name: String, output_handle: Handle, target: Target) -> Self {
        Self {
            name,
            state: LinkState::Unattached,
            output_handle,
            input_handle: None,
            source: Source::default(),
            target,
            snd_settle_mode: SenderSettleMode::Mixed,
            rcv_settle_mode: ReceiverSettleMode::First,
            max_message_size: None,
            flow_state: SenderFlowState::new(0),
            tag_generator: DeliveryTagGenerator::new(),
            unsettled: BTreeMap::new(),
            local_error: None,
            remote_error: None,
        }
    }

    pub fn attach(&mut self) -> Result<Attach, Error> {
        match self.state {
            LinkState::Unattached => self.state = LinkState::AttachSent,
            LinkState::AttachReceived => self.state = LinkState::Attached,
            _ => return Err(Error::illegal_state("link is already attached")),
        }

        Ok(Attach {
            name: self.name.clone(),
            handle: self.output_handle,
            role: Role::Sender,
            snd_settle_mode: self.snd_settle_mode,
            rcv_settle_mode: self.rcv_settle_mode,
            source: Some(self.source.clone()),
            target: Some(self.target.clone()),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: Some(self.flow_state.initial_delivery_count()),
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        })
    }

    pub fn on_incoming_attach(&mut self, attach: Attach) -> Result<(), Error> {
        if attach.role != Role::Receiver {
            return Err(Error::amqp_error(
                AmqpError::InvalidField,
                String::from("the peer of a sender must be a receiver"),
            ));
        }

        match self.state {
            LinkState::AttachSent => self.state = LinkState::Attached,
            LinkState::Unattached => self.state = LinkState::AttachReceived,
            _ => return Err(Error::illegal_state("unexpected attach")),
        }

        self.input_handle = Some(attach.handle);
        self.max_message_size = attach.max_message_size.filter(|size| *size > 0);
        self.rcv_settle_mode = attach.rcv_settle_mode;
        Ok(())
    }

    pub fn detach(&mut self, error: Option<definitions::Error>) -> Result<Detach, Error> {
        match self.state {
            LinkState::AttachSent | LinkState::Attached => self.state = LinkState::DetachSent,
            LinkState::DetachReceived => self.state = LinkState::Detached,
            _ => return Err(Error::illegal_state("link is not attached")),
        }

        self.local_error = error.clone();
        Ok(Detach {
            handle: self.output_handle,
            closed: true,
            error,
        })
    }

    pub fn on_incoming_detach(&mut self, detach: Detach) -> Result<(), Error> {
        match self.state {
            LinkState::AttachSent | LinkState::Attached => self.state = LinkState::DetachReceived,
            LinkState::DetachSent => self.state = LinkState::Detached,
            _ => return Err(Error::illegal_state("unexpected detach")),
        }

        self.input_handle = None;
        self.remote_error = detach.error;
        Ok(())
    }

    /// Returns whether the peer asked for the link state to be echoed
    pub fn on_incoming_flow(&mut self, flow: &Flow) -> bool {
        self.flow_state.on_incoming_flow(flow)
    }

    /// Writes the link fields of a flow
    pub fn write_flow(&self, flow: &mut Flow) {
        flow.handle = Some(self.output_handle);
        self.flow_state.write_to(flow);
    }

    pub fn is_tag_in_use(&self, tag: &DeliveryTag) -> bool {
        self.unsettled.contains_key(tag)
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_types::{
        definitions::{Handle, LinkError, Role},
        messaging::Target,
        performatives::Detach,
        states::LinkState,
    };

    use super::SenderLink;

    fn link() -> SenderLink {
        SenderLink::new(String::from("my_sender"), Handle(0), Target::new("q1"))
    }

    #[test]
    fn attach_exchange() {
        let mut link = link();
        let mut attach = link.attach().unwrap();
        assert_eq!(attach.role, Role::Sender);
        assert_eq!(attach.initial_delivery_count, Some(0));
        assert_eq!(
            attach.target.as_ref().and_then(|t| t.address.as_deref()),
            Some("q1")
        );
        assert_eq!(link.state, LinkState::AttachSent);
        assert!(link.attach().is_err());

        attach.role = Role::Receiver;
        attach.handle = Handle(7);
        link.on_incoming_attach(attach).unwrap();
        assert_eq!(link.state, LinkState::Attached);
        assert_eq!(link.input_handle, Some(Handle(7)));
    }

    #[test]
    fn attach_from_another_sender_is_rejected() {
        let mut link = link();
        let attach = link.attach().unwrap();
        assert!(link.on_incoming_attach(attach).is_err());
    }

    #[test]
    fn remote_detach_then_local_detach() {
        let mut link = link();
        let mut attach = link.attach().unwrap();
        attach.role = Role::Receiver;
        link.on_incoming_attach(attach).unwrap();

        link.on_incoming_detach(Detach {
            handle: Handle(0),
            closed: true,
            error: Some(LinkError::DetachForced.into()),
        })
        .unwrap();
        assert_eq!(link.state, LinkState::DetachReceived);
        assert!(link.remote_error.is_some());

        let detach = link.detach(None).unwrap();
        assert!(detach.closed);
        assert_eq!(link.state, LinkState::Detached);
        assert!(link.detach(None).is_err());
    }
}
