//! Case supervisor for fault-tolerant actor management.
//!
//! The supervisor monitors case actors and automatically restarts
//! them if they fail or terminate unexpectedly. A restarted actor
//! rehydrates its aggregate from the event log, so no case state is
//! lost across a restart.

use crate::domain::actor::{CaseActor, CaseActorArgs};
use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};

/// Messages for the case supervisor.
pub enum SupervisorMsg {
    /// Spawn a new case actor.
    Spawn(CaseActorArgs),
}

/// The case supervisor actor.
pub struct CaseSupervisor;

#[async_trait]
impl Actor for CaseSupervisor {
    type Msg = SupervisorMsg;
    type State = Option<CaseActorArgs>;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(None)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            SupervisorMsg::Spawn(args) => {
                *state = Some(args.clone());
                let _ = CaseActor::spawn_linked(None, CaseActor, args, myself.get_cell()).await?;
            }
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        evt: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if matches!(
            evt,
            SupervisionEvent::ActorFailed(_, _) | SupervisionEvent::ActorTerminated(_, _, _)
        ) {
            if let Some(args) = state.clone() {
                let _ = CaseActor::spawn_linked(None, CaseActor, args, myself.get_cell()).await?;
            }
        }
        Ok(())
    }
}
