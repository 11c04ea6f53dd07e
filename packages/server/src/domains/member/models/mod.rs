pub mod community_id;
pub mod member;

pub use community_id::{
    parse_class_number, CommunityId, GroupKey, InvalidCommunityId, COMMUNITY_ID_PATTERN,
    COMMUNITY_ID_PATTERN_WIDE, MAX_CLASS_NUMBER, MAX_SEQUENCE,
};
pub use member::{GroupSlot, Member, NewMember, MEMBERS_COMMUNITY_ID_KEY, MEMBERS_GROUP_SEQUENCE_KEY};
