use rand::Rng;
use std::sync::Arc;

use super::matcher::{render_preview, PlaceholderMatcher};
use super::numbers::assign_numbers;
use super::sampler::{draw_order, SamplerError};
use super::{GameError, PlaceholderKind};
use crate::bot::transport::Transport;
use crate::database::models::{ParticipantAddress, SessionParticipant};
use crate::database::GameStore;
use crate::utils::logging::{log_delivery_failure, log_session_event};
use crate::utils::markup::{emphasize, escape_html, strip_emphasis};

/// Written into a slot no remaining player can fill.
pub const NO_MATCH: &str = "[no match]";

/// A command with names filled in, before delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub text: String,
    /// Players whose name went into a slot.
    pub participated: Vec<i64>,
    /// Players left out this round.
    pub idle: Vec<i64>,
}

/// Outcome of one broadcast round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub session_id: i64,
    pub text: String,
    pub participated: Vec<i64>,
    pub idle: Vec<i64>,
    /// Players the text reached.
    pub delivered: usize,
}

/// Fills the placeholders of `command` with player names.
///
/// The result is Telegram HTML: the command and the names are escaped, only
/// the emphasis around names is markup. Gendered slots are served first, then neutral ones, each time taking the
/// earliest matching player in a fairness-weighted draw order. A player fills
/// at most one slot.
pub fn render_command<R: Rng + ?Sized>(
    matcher: &PlaceholderMatcher,
    command: &str,
    participants: &[SessionParticipant],
    rng: &mut R,
) -> Result<RenderedCommand, SamplerError> {
    let mut text = escape_html(&strip_emphasis(command));
    let matches = matcher.find_matches(&text, rng);
    let order = draw_order(participants, |participant| participant.idle_count, rng)?;

    let mut pool: Vec<&SessionParticipant> = order
        .into_iter()
        .filter_map(|position| participants.get(position))
        .collect();

    let mut participated = Vec::new();
    let mut names: Vec<Option<String>> = vec![None; matches.len()];

    for gendered_pass in [true, false] {
        for (slot, found) in matches.iter().enumerate() {
            if found.kind.is_gendered() != gendered_pass {
                continue;
            }
            let name = match take_participant(&mut pool, found.kind) {
                Some(participant) => {
                    participated.push(participant.user_id);
                    escape_html(&participant.name)
                }
                None => NO_MATCH.to_string(),
            };
            names[slot] = Some(name);
        }
    }

    // right to left, so earlier offsets stay valid
    for (found, name) in matches.iter().zip(names).rev() {
        let name = name.unwrap_or_else(|| NO_MATCH.to_string());
        text.replace_range(found.at..found.end(), &emphasize(&name));
    }

    Ok(RenderedCommand {
        text,
        participated,
        idle: pool.iter().map(|participant| participant.user_id).collect(),
    })
}

fn take_participant<'a>(
    pool: &mut Vec<&'a SessionParticipant>,
    kind: PlaceholderKind,
) -> Option<&'a SessionParticipant> {
    let position = pool.iter().position(|participant| kind.accepts(participant.gender))?;
    Some(pool.remove(position))
}

/// Plays command rounds for sessions and delivers the results.
#[derive(Clone)]
pub struct CommandBroadcaster {
    store: GameStore,
    matcher: Arc<PlaceholderMatcher>,
    transport: Arc<dyn Transport>,
    backlog_capacity: i64,
}

impl CommandBroadcaster {
    pub fn new(
        store: GameStore,
        matcher: Arc<PlaceholderMatcher>,
        transport: Arc<dyn Transport>,
        backlog_capacity: i64,
    ) -> Self {
        Self {
            store,
            matcher,
            transport,
            backlog_capacity,
        }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Renders `command` for the session, sends it to every player and
    /// updates idle counts: picked players reset, everyone else +1. Players
    /// who moved to another session during delivery keep their new count.
    pub async fn broadcast(&self, session_id: i64, command: &str) -> Result<BroadcastReport, GameError> {
        let participants = self.store.participant_views(session_id).await?;

        let rendered = {
            let mut rng = rand::thread_rng();
            render_command(&self.matcher, command, &participants, &mut rng)?
        };

        let mut delivered = 0;
        for participant in &participants {
            if self.deliver(participant, &rendered.text).await? {
                delivered += 1;
            }
        }

        self.store
            .adjust_idle_counts(session_id, &rendered.idle, 1, &rendered.participated)
            .await?;

        log_session_event(
            "broadcast",
            session_id,
            Some(&format!(
                "{} picked, {} idle, {} delivered",
                rendered.participated.len(),
                rendered.idle.len(),
                delivered
            )),
        );

        Ok(BroadcastReport {
            session_id,
            text: rendered.text,
            participated: rendered.participated,
            idle: rendered.idle,
            delivered,
        })
    }

    /// Pops a random suggested command and broadcasts it; `None` if the
    /// queue is empty.
    pub async fn reveal_suggestion(&self, session_id: i64) -> Result<Option<BroadcastReport>, GameError> {
        match self.store.pop_random_suggestion(session_id).await? {
            Some(command) => Ok(Some(self.broadcast(session_id, &command).await?)),
            None => Ok(None),
        }
    }

    /// Shows where the placeholders of `command` are, labelled by `label`.
    pub fn preview<F>(&self, command: &str, label: F) -> String
    where
        F: Fn(PlaceholderKind) -> String,
    {
        let text = strip_emphasis(command);
        let matches = self.matcher.find_matches(&text, &mut rand::thread_rng());
        render_preview(&text, &matches, label)
    }

    /// Hands out secret player numbers; returns how many players got one.
    pub async fn give_numbers(&self, session_id: i64) -> Result<usize, GameError> {
        let participants = self.store.participant_views(session_id).await?;
        let assignments = assign_numbers(&participants, &mut rand::thread_rng());

        for assignment in &assignments {
            let participant = participants
                .iter()
                .find(|participant| participant.user_id == assignment.user_id);
            if let Some(participant) = participant {
                self.deliver(participant, &assignment.message()).await?;
            }
        }

        log_session_event("numbers", session_id, Some(&format!("{} players numbered", assignments.len())));
        Ok(assignments.len())
    }

    /// Chat players get the text through the transport, web players in
    /// their backlog. Transport failures are logged and reported as `false`.
    pub async fn deliver(&self, participant: &SessionParticipant, text: &str) -> Result<bool, sqlx::Error> {
        match participant.address {
            ParticipantAddress::Chat(chat_id) => match self.transport.send_message(chat_id, text, None).await {
                Ok(_) => Ok(true),
                Err(e) => {
                    log_delivery_failure(&format!("chat {chat_id}"), &e.to_string());
                    Ok(false)
                }
            },
            ParticipantAddress::Web(_) => {
                self.store
                    .append_backlog_message(participant.user_id, text, self.backlog_capacity)
                    .await?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Gender, PlaceholderConfig};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn matcher() -> PlaceholderMatcher {
        PlaceholderMatcher::new(&PlaceholderConfig {
            female: vec!["{f}".to_string()],
            male: vec!["{m}".to_string()],
            common: vec!["{p}".to_string()],
            opposite: ["{x}".to_string(), "{y}".to_string()],
        })
        .unwrap()
    }

    fn participant(user_id: i64, name: &str, gender: Gender, idle_count: i64) -> SessionParticipant {
        SessionParticipant {
            user_id,
            address: ParticipantAddress::Chat(user_id),
            name: name.to_string(),
            gender,
            idle_count,
        }
    }

    #[test]
    fn test_gendered_slots_get_matching_players() {
        let players = vec![
            participant(1, "Bob", Gender::MALE, 0),
            participant(2, "Anna", Gender::FEMALE, 0),
        ];
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let rendered = render_command(&matcher(), "{f} kisses {m}", &players, &mut rng).unwrap();

            assert_eq!(rendered.text, "<b>Anna</b> kisses <b>Bob</b>");
            assert_eq!(rendered.participated.len(), 2);
            assert!(rendered.idle.is_empty());
        }
    }

    #[test]
    fn test_gendered_slots_are_served_before_neutral_ones() {
        // the only male must end up in {m} even though {p} comes first
        let players = vec![
            participant(1, "Bob", Gender::MALE, 10),
            participant(2, "Anna", Gender::FEMALE, 0),
        ];
        let mut rng = SmallRng::seed_from_u64(1);
        let rendered = render_command(&matcher(), "{p} and {m}", &players, &mut rng).unwrap();

        assert_eq!(rendered.text, "<b>Anna</b> and <b>Bob</b>");
    }

    #[test]
    fn test_missing_gender_falls_back() {
        let players = vec![participant(1, "Anna", Gender::FEMALE, 0)];
        let mut rng = SmallRng::seed_from_u64(1);
        let rendered = render_command(&matcher(), "{m} waves", &players, &mut rng).unwrap();

        assert_eq!(rendered.text, "<b>[no match]</b> waves");
        assert!(rendered.participated.is_empty());
        assert_eq!(rendered.idle, vec![1]);
    }

    #[test]
    fn test_more_slots_than_players() {
        let players = vec![participant(1, "Anna", Gender::FEMALE, 0)];
        let mut rng = SmallRng::seed_from_u64(1);
        let rendered = render_command(&matcher(), "{p} and {p}", &players, &mut rng).unwrap();

        assert_eq!(rendered.text, "<b>Anna</b> and <b>[no match]</b>");
        assert_eq!(rendered.participated, vec![1]);
    }

    #[test]
    fn test_no_placeholders_leaves_everyone_idle() {
        let players = vec![
            participant(1, "Anna", Gender::FEMALE, 0),
            participant(2, "Bob", Gender::MALE, 3),
        ];
        let mut rng = SmallRng::seed_from_u64(1);
        let rendered = render_command(&matcher(), "everybody <b>dance</b>", &players, &mut rng).unwrap();

        assert_eq!(rendered.text, "everybody dance");
        assert!(rendered.participated.is_empty());
        let mut idle = rendered.idle.clone();
        idle.sort_unstable();
        assert_eq!(idle, vec![1, 2]);
    }

    #[test]
    fn test_names_and_command_are_escaped() {
        let players = vec![participant(1, "Tom & <3", Gender::MALE, 0)];
        let mut rng = SmallRng::seed_from_u64(1);
        let rendered = render_command(&matcher(), "{p} says 1 < 2 <b>&</b>", &players, &mut rng).unwrap();

        assert_eq!(rendered.text, "<b>Tom &amp; &lt;3</b> says 1 &lt; 2 &amp;");
        assert_eq!(rendered.participated, vec![1]);
    }

    #[test]
    fn test_idle_player_is_preferred_for_neutral_slot() {
        let players = vec![
            participant(1, "Anna", Gender::FEMALE, 0),
            participant(2, "Bob", Gender::MALE, 0),
            participant(3, "Cleo", Gender::NONE, 8),
        ];
        let mut cleo = 0;
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let rendered = render_command(&matcher(), "{p} sings", &players, &mut rng).unwrap();
            if rendered.participated == vec![3] {
                cleo += 1;
            }
        }
        assert!(cleo > 170, "idle player picked {cleo} times");
    }
}
