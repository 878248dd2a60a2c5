//! Sharing: invite users to an item by e-mail.

use crate::api_client::GraphApiClient;
use crate::error::GraphResult;
use crate::types::{DriveRecipient, InviteRequest, PaginatedResponse, Permission};
use log::info;

/// Role granted by [`SharepointSharing::invite`] when none is given.
pub const DEFAULT_INVITE_ROLE: &str = "write";

/// Sharing operations on one drive.
pub struct SharepointSharing<'a> {
    client: &'a GraphApiClient,
    drive_id: &'a str,
}

impl<'a> SharepointSharing<'a> {
    pub fn new(client: &'a GraphApiClient, drive_id: &'a str) -> Self {
        Self { client, drive_id }
    }

    /// Invite a recipient, requiring sign-in and sending the invitation
    /// mail. Returns the permissions Graph granted.
    pub async fn invite(
        &self,
        item_id: &str,
        email: &str,
        roles: &[&str],
    ) -> GraphResult<Vec<Permission>> {
        let roles = if roles.is_empty() {
            vec![DEFAULT_INVITE_ROLE.to_string()]
        } else {
            roles.iter().map(|r| r.to_string()).collect()
        };
        let request = InviteRequest {
            recipients: vec![DriveRecipient {
                email: email.to_string(),
            }],
            roles,
            require_sign_in: true,
            send_invitation: true,
            message: None,
        };

        let path = format!("drives/{}/items/{}/invite", self.drive_id, item_id);
        let resp = self
            .client
            .post(&path, &serde_json::to_value(&request)?)
            .await?;
        let perms = parse_permissions(resp)?;
        info!("Invited {} to item {} ({} permissions)", email, item_id, perms.len());
        Ok(perms)
    }
}

/// Decode the `invite` response body.
fn parse_permissions(body: serde_json::Value) -> GraphResult<Vec<Permission>> {
    let page: PaginatedResponse<Permission> = serde_json::from_value(body)?;
    Ok(page.value)
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
