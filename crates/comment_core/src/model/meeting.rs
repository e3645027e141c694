//! Meeting projection used for comment moderation.
//!
//! Only membership and leadership are modeled; the rest of a meeting lives
//! in the surrounding application.

use crate::model::comment::{CommentableId, UserId};
use serde::Serialize;

/// One attendee row of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeetingMember {
    pub user_id: UserId,
    /// Leaders may moderate every comment on the meeting.
    pub leader: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meeting {
    pub id: CommentableId,
    pub name: String,
    pub members: Vec<MeetingMember>,
}

impl Meeting {
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|member| member.user_id == user_id)
    }

    /// Leadership is checked independently of membership rows.
    pub fn is_led_by(&self, user_id: UserId) -> bool {
        self.members
            .iter()
            .any(|member| member.user_id == user_id && member.leader)
    }

    /// Member ids excluding `user_id`, in stored order.
    pub fn members_except(&self, user_id: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.members
            .iter()
            .map(|member| member.user_id)
            .filter(move |member_id| *member_id != user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Meeting, MeetingMember};

    fn meeting() -> Meeting {
        Meeting {
            id: 1,
            name: "support circle".to_string(),
            members: vec![
                MeetingMember {
                    user_id: 10,
                    leader: true,
                },
                MeetingMember {
                    user_id: 20,
                    leader: false,
                },
            ],
        }
    }

    #[test]
    fn leader_is_member_and_leader() {
        let meeting = meeting();
        assert!(meeting.is_member(10));
        assert!(meeting.is_led_by(10));
    }

    #[test]
    fn plain_member_does_not_lead() {
        let meeting = meeting();
        assert!(meeting.is_member(20));
        assert!(!meeting.is_led_by(20));
        assert!(!meeting.is_member(30));
    }

    #[test]
    fn members_except_skips_actor() {
        let others = meeting().members_except(10).collect::<Vec<_>>();
        assert_eq!(others, vec![20]);
    }
}
