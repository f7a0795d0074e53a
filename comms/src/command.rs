use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;

/// User Command for joining a room, either by its canonical or its read-only id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomCommand {
    // The room to join.
    #[serde(rename = "r")]
    pub room: String,
    // The shared access token.
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    // The viewport of the joining client, if it reported one.
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

/// User Command for relaying a drawing event to the joined room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCommand {
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    // Arbitrary drawing event, opaque to the relay apart from sanitization.
    #[serde(rename = "c")]
    pub content: serde_json::Value,
}

/// User Command for drawing into any room without joining it, every member of the room receives the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawToRoomCommand {
    #[serde(rename = "r")]
    pub room: String,
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "c")]
    pub content: serde_json::Value,
}

/// User Command for reporting a new viewport size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateViewportCommand {
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "v")]
    pub viewport: Viewport,
}

/// User Command for loading the stored drawing history of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRoomCommand {
    #[serde(rename = "r")]
    pub room: String,
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// User Command for asking the read-only id paired with a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetReadOnlyIdCommand {
    #[serde(rename = "r")]
    pub room: String,
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// User Command for uploading a base64 encoded image to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadImageCommand {
    #[serde(rename = "r")]
    pub room: String,
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    // Client supplied timestamp used in the file name.
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    // Image data, optionally prefixed with a `data:image/...;base64,` header.
    #[serde(rename = "i")]
    pub image_data: String,
}

/// User Command for quitting the whole relay session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuitCommand;

/// A user command which can be sent to the server by a single connection.
/// All commands are processed in the context of the relay paired with an individual connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "snake_case")]
pub enum UserCommand {
    JoinRoom(JoinRoomCommand),
    Draw(DrawCommand),
    DrawToRoom(DrawToRoomCommand),
    UpdateViewport(UpdateViewportCommand),
    LoadRoom(LoadRoomCommand),
    GetReadOnlyId(GetReadOnlyIdCommand),
    UploadImage(UploadImageCommand),
    Quit(QuitCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    // given a command enum, and an expect string, asserts that command is serialized / deserialized appropiately
    fn assert_command_serialization(command: &UserCommand, expected: &str) {
        let serialized = serde_json::to_string(&command).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: UserCommand = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *command);
    }

    #[test]
    fn test_join_command() {
        let command = UserCommand::JoinRoom(JoinRoomCommand {
            room: "board".to_string(),
            access_token: Some("secret".to_string()),
            viewport: Some(Viewport { w: 800, h: 600 }),
        });

        assert_command_serialization(
            &command,
            r#"{"_ct":"join_room","r":"board","at":"secret","v":{"w":800,"h":600}}"#,
        );
    }

    #[test]
    fn test_join_command_without_optionals() {
        let command: UserCommand = serde_json::from_str(r#"{"_ct":"join_room","r":"board"}"#).unwrap();

        assert_eq!(
            command,
            UserCommand::JoinRoom(JoinRoomCommand {
                room: "board".to_string(),
                access_token: None,
                viewport: None,
            })
        );
    }

    #[test]
    fn test_draw_command() {
        let command = UserCommand::Draw(DrawCommand {
            access_token: None,
            content: serde_json::json!({"t": "pen", "d": [1, 2, 3, 4]}),
        });

        assert_command_serialization(&command, r#"{"_ct":"draw","c":{"d":[1,2,3,4],"t":"pen"}}"#);
    }

    #[test]
    fn test_draw_to_room_command() {
        let command = UserCommand::DrawToRoom(DrawToRoomCommand {
            room: "board".to_string(),
            access_token: Some("secret".to_string()),
            content: serde_json::json!({"t": "clear"}),
        });

        assert_command_serialization(
            &command,
            r#"{"_ct":"draw_to_room","r":"board","at":"secret","c":{"t":"clear"}}"#,
        );
    }

    #[test]
    fn test_update_viewport_command() {
        let command = UserCommand::UpdateViewport(UpdateViewportCommand {
            access_token: None,
            viewport: Viewport { w: 10, h: 20 },
        });

        assert_command_serialization(&command, r#"{"_ct":"update_viewport","v":{"w":10,"h":20}}"#);
    }

    #[test]
    fn test_quit_command() {
        let command = UserCommand::Quit(QuitCommand);

        assert_command_serialization(&command, r#"{"_ct":"quit"}"#);
    }
}
