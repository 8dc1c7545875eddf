use rand::seq::SliceRandom;
use rand::Rng;

use crate::database::models::SessionParticipant;

/// Secret numbers handed to one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberAssignment {
    pub user_id: i64,
    /// 1-based position among all numbered players.
    pub player_number: usize,
    /// 1-based position among female players.
    pub female_number: Option<usize>,
    /// 1-based position among male players.
    pub male_number: Option<usize>,
}

impl NumberAssignment {
    pub fn message(&self) -> String {
        let mut lines = vec![format!("🎲 Your number: <b>{}</b>", self.player_number)];
        if let Some(number) = self.female_number {
            lines.push(format!("♀ Female number: <b>{number}</b>"));
        }
        if let Some(number) = self.male_number {
            lines.push(format!("♂ Male number: <b>{number}</b>"));
        }
        lines.join("\n")
    }
}

/// Shuffles the players and numbers everyone who picked a gender.
///
/// Players with both genders get a number in each gender line.
pub fn assign_numbers<R: Rng + ?Sized>(participants: &[SessionParticipant], rng: &mut R) -> Vec<NumberAssignment> {
    let mut shuffled: Vec<&SessionParticipant> = participants
        .iter()
        .filter(|participant| participant.gender.bits() != 0)
        .collect();
    shuffled.shuffle(rng);

    let mut female_count = 0;
    let mut male_count = 0;

    shuffled
        .into_iter()
        .enumerate()
        .map(|(position, participant)| {
            let female_number = participant.gender.is_female().then(|| {
                female_count += 1;
                female_count
            });
            let male_number = participant.gender.is_male().then(|| {
                male_count += 1;
                male_count
            });
            NumberAssignment {
                user_id: participant.user_id,
                player_number: position + 1,
                female_number,
                male_number,
            }
        })
        .collect()
}
