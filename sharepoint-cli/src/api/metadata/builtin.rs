//! Descriptor tables for the models every SharePoint / Graph tenant exposes

use super::models::{FieldDescriptor as Field, FieldKind, ModelDescriptor};

pub(super) fn models() -> Vec<ModelDescriptor> {
    vec![web(), list(), list_item(), user(), drive_item()]
}

fn web() -> ModelDescriptor {
    ModelDescriptor::new("Web")
        .sharepoint_collection("web/webs", true)
        .graph_collection("sites/root/sites", false)
        .field(Field::new("Id", FieldKind::Guid).sharepoint("Id").key())
        .field(Field::new("Title", FieldKind::String).sharepoint("Title").graph("displayName"))
        .field(Field::new("Description", FieldKind::String).sharepoint("Description").graph("description"))
        .field(Field::new("Url", FieldKind::String).sharepoint("Url").graph("webUrl"))
        .field(Field::new("Created", FieldKind::DateTime).sharepoint("Created").graph("createdDateTime"))
        .field(
            Field::new("Lists", FieldKind::Collection)
                .sharepoint("Lists")
                .graph("lists")
                .expands_to("List"),
        )
}

fn list() -> ModelDescriptor {
    ModelDescriptor::new("List")
        .sharepoint_collection("web/lists", true)
        .graph_collection("sites/root/lists", false)
        .field(Field::new("Id", FieldKind::Guid).sharepoint("Id").graph("id").key())
        .field(Field::new("Title", FieldKind::String).sharepoint("Title").graph("displayName"))
        .field(Field::new("Description", FieldKind::String).sharepoint("Description").graph("description"))
        .field(Field::new("ItemCount", FieldKind::Integer).sharepoint("ItemCount"))
        .field(Field::new("Hidden", FieldKind::Boolean).sharepoint("Hidden"))
        .field(Field::new("Created", FieldKind::DateTime).sharepoint("Created").graph("createdDateTime"))
        .field(
            Field::new("Items", FieldKind::Collection)
                .sharepoint("Items")
                .graph("items")
                .expands_to("ListItem"),
        )
}

fn list_item() -> ModelDescriptor {
    ModelDescriptor::new("ListItem")
        .sharepoint_collection("web/lists/getbytitle('Documents')/items", false)
        .graph_collection("sites/root/lists/Documents/items", false)
        .field(Field::new("Id", FieldKind::Integer).sharepoint("Id").key())
        .field(Field::new("UniqueId", FieldKind::Guid).sharepoint("GUID"))
        .field(Field::new("Title", FieldKind::String).sharepoint("Title"))
        .field(Field::new("Created", FieldKind::DateTime).sharepoint("Created").graph("createdDateTime"))
        .field(Field::new("Modified", FieldKind::DateTime).sharepoint("Modified").graph("lastModifiedDateTime"))
        .field(Field::new("WebUrl", FieldKind::String).graph("webUrl"))
        .field(
            Field::new("Author", FieldKind::Lookup)
                .sharepoint("Author")
                .expands_to("User"),
        )
        .field(
            Field::new("Editor", FieldKind::Lookup)
                .sharepoint("Editor")
                .expands_to("User"),
        )
}

fn user() -> ModelDescriptor {
    ModelDescriptor::new("User")
        .sharepoint_collection("web/siteusers", true)
        .graph_collection("users", false)
        .field(Field::new("Id", FieldKind::Integer).sharepoint("Id").key())
        .field(Field::new("AadObjectId", FieldKind::Guid).graph("id"))
        .field(Field::new("Title", FieldKind::String).sharepoint("Title").graph("displayName"))
        .field(Field::new("Email", FieldKind::String).sharepoint("Email").graph("mail"))
        .field(Field::new("LoginName", FieldKind::String).sharepoint("LoginName"))
        .field(Field::new("UserPrincipalName", FieldKind::String).sharepoint("UserPrincipalName").graph("userPrincipalName"))
        .field(Field::new("IsSiteAdmin", FieldKind::Boolean).sharepoint("IsSiteAdmin"))
}

fn drive_item() -> ModelDescriptor {
    ModelDescriptor::new("DriveItem")
        .graph_collection("me/drive/root/children", false)
        .field(Field::new("Id", FieldKind::String).graph("id").key())
        .field(Field::new("Name", FieldKind::String).graph("name"))
        .field(Field::new("Size", FieldKind::Integer).graph("size"))
        .field(Field::new("WebUrl", FieldKind::String).graph("webUrl"))
        .field(Field::new("LastModified", FieldKind::DateTime).graph("lastModifiedDateTime"))
        .field(
            Field::new("Children", FieldKind::Collection)
                .graph("children")
                .expands_to("DriveItem"),
        )
}
