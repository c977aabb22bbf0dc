//! Endpoint paths, relative to the versioned base URL.

pub const GATEWAY: &str = "/gateway";
pub const ME: &str = "/users/@me";
pub const ME_GUILDS: &str = "/users/@me/guilds";
pub const ME_CHANNELS: &str = "/users/@me/channels";

pub fn user(user_id: &str) -> String {
    format!("/users/{user_id}")
}

pub fn channel(channel_id: &str) -> String {
    format!("/channels/{channel_id}")
}

pub fn messages(channel_id: &str) -> String {
    format!("/channels/{channel_id}/messages")
}

pub fn message(channel_id: &str, message_id: &str) -> String {
    format!("/channels/{channel_id}/messages/{message_id}")
}

pub fn typing(channel_id: &str) -> String {
    format!("/channels/{channel_id}/typing")
}

pub fn guild(guild_id: &str) -> String {
    format!("/guilds/{guild_id}")
}

pub fn guild_channels(guild_id: &str) -> String {
    format!("/guilds/{guild_id}/channels")
}

pub fn guild_members(guild_id: &str) -> String {
    format!("/guilds/{guild_id}/members")
}

pub fn guild_member(guild_id: &str, user_id: &str) -> String {
    format!("/guilds/{guild_id}/members/{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(message("1", "2"), "/channels/1/messages/2");
        assert_eq!(guild_member("3", "4"), "/guilds/3/members/4");
        assert_eq!(typing("5"), "/channels/5/typing");
    }
}
