//! Hand-written models shaped like generator output, for unit tests.

pub use post::Post;
pub use user::User;

pub mod user {
    use serde::{Deserialize, Serialize};

    use crate::filter::{Filter, FilterValue};
    use crate::inputs::Assignment;
    use crate::meta::{DefaultKind, FieldMeta, ModelMeta, RelationMeta, ScalarKind};
    use crate::traits::{CreateData, Model, ScalarFieldEnum, UniqueFilter, UpdateData};

    pub static FIELDS: [FieldMeta; 3] = [
        FieldMeta {
            name: "id",
            column: "id",
            kind: ScalarKind::String,
            optional: false,
            id: true,
            unique: false,
            updated_at: false,
            default: DefaultKind::Uuid,
        },
        FieldMeta {
            name: "name",
            column: "name",
            kind: ScalarKind::String,
            optional: true,
            id: false,
            unique: false,
            updated_at: false,
            default: DefaultKind::None,
        },
        FieldMeta {
            name: "email",
            column: "email",
            kind: ScalarKind::String,
            optional: true,
            id: false,
            unique: true,
            updated_at: false,
            default: DefaultKind::None,
        },
    ];

    pub static POSTS: RelationMeta = RelationMeta {
        name: "posts",
        model: "User",
        target: &super::post::META,
        fields: &["id"],
        columns: &["id"],
        references: &["createdById"],
        reference_columns: &["createdById"],
        list: true,
        optional: false,
    };

    pub static META: ModelMeta = ModelMeta {
        name: "User",
        table: "User",
        fields: &FIELDS,
        relations: &[&POSTS],
        primary_key: &["id"],
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ScalarField {
        Id,
        Name,
        Email,
    }

    impl ScalarFieldEnum for ScalarField {
        fn meta(&self) -> &'static FieldMeta {
            match self {
                Self::Id => &FIELDS[0],
                Self::Name => &FIELDS[1],
                Self::Email => &FIELDS[2],
            }
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct UserCount {
        pub posts: i64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct User {
        pub id: String,
        pub name: Option<String>,
        pub email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub posts: Option<Vec<super::Post>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub _count: Option<UserCount>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum UniqueWhere {
        Id(String),
        Email(String),
    }

    impl UniqueFilter for UniqueWhere {
        fn into_filter(self) -> Filter {
            match self {
                Self::Id(v) => Filter::Equals("id".into(), v.into()),
                Self::Email(v) => Filter::Equals("email".into(), v.into()),
            }
        }

        fn columns(&self) -> &'static [&'static str] {
            match self {
                Self::Id(_) => &["id"],
                Self::Email(_) => &["email"],
            }
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CreateInput {
        pub id: Option<String>,
        pub name: Option<String>,
        pub email: Option<String>,
    }

    impl CreateData for CreateInput {
        fn into_values(self) -> Vec<(&'static str, FilterValue)> {
            let mut values = Vec::new();
            if let Some(v) = self.id {
                values.push(("id", v.into()));
            }
            if let Some(v) = self.name {
                values.push(("name", v.into()));
            }
            if let Some(v) = self.email {
                values.push(("email", v.into()));
            }
            values
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct UpdateInput {
        pub name: Option<Option<String>>,
        pub email: Option<Option<String>>,
    }

    impl UpdateData for UpdateInput {
        fn into_assignments(self) -> Vec<(&'static str, Assignment)> {
            let mut assignments = Vec::new();
            if let Some(v) = self.name {
                assignments.push(("name", Assignment::Set(v.into())));
            }
            if let Some(v) = self.email {
                assignments.push(("email", Assignment::Set(v.into())));
            }
            assignments
        }
    }

    impl Model for User {
        const MODEL_NAME: &'static str = "User";
        const TABLE_NAME: &'static str = "User";

        type ScalarField = ScalarField;
        type UniqueWhere = UniqueWhere;
        type CreateInput = CreateInput;
        type UpdateInput = UpdateInput;

        fn meta() -> &'static ModelMeta {
            &META
        }
    }
}

pub mod post {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    use crate::filter::{Filter, FilterValue};
    use crate::inputs::{Assignment, NumberUpdate};
    use crate::meta::{DefaultKind, FieldMeta, ModelMeta, RelationMeta, ScalarKind};
    use crate::traits::{CreateData, Model, ScalarFieldEnum, UniqueFilter, UpdateData};

    pub static FIELDS: [FieldMeta; 5] = [
        FieldMeta {
            name: "id",
            column: "id",
            kind: ScalarKind::Int,
            optional: false,
            id: true,
            unique: false,
            updated_at: false,
            default: DefaultKind::Autoincrement,
        },
        FieldMeta {
            name: "name",
            column: "name",
            kind: ScalarKind::String,
            optional: false,
            id: false,
            unique: false,
            updated_at: false,
            default: DefaultKind::None,
        },
        FieldMeta {
            name: "createdAt",
            column: "createdAt",
            kind: ScalarKind::DateTime,
            optional: false,
            id: false,
            unique: false,
            updated_at: false,
            default: DefaultKind::Now,
        },
        FieldMeta {
            name: "updatedAt",
            column: "updatedAt",
            kind: ScalarKind::DateTime,
            optional: false,
            id: false,
            unique: false,
            updated_at: true,
            default: DefaultKind::None,
        },
        FieldMeta {
            name: "createdById",
            column: "createdById",
            kind: ScalarKind::String,
            optional: false,
            id: false,
            unique: false,
            updated_at: false,
            default: DefaultKind::None,
        },
    ];

    pub static CREATED_BY: RelationMeta = RelationMeta {
        name: "createdBy",
        model: "Post",
        target: &super::user::META,
        fields: &["createdById"],
        columns: &["createdById"],
        references: &["id"],
        reference_columns: &["id"],
        list: false,
        optional: false,
    };

    pub static META: ModelMeta = ModelMeta {
        name: "Post",
        table: "Post",
        fields: &FIELDS,
        relations: &[&CREATED_BY],
        primary_key: &["id"],
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ScalarField {
        Id,
        Name,
        CreatedAt,
        UpdatedAt,
        CreatedById,
    }

    impl ScalarFieldEnum for ScalarField {
        fn meta(&self) -> &'static FieldMeta {
            match self {
                Self::Id => &FIELDS[0],
                Self::Name => &FIELDS[1],
                Self::CreatedAt => &FIELDS[2],
                Self::UpdatedAt => &FIELDS[3],
                Self::CreatedById => &FIELDS[4],
            }
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Post {
        pub id: i32,
        pub name: String,
        #[serde(rename = "createdAt")]
        pub created_at: DateTime<Utc>,
        #[serde(rename = "updatedAt")]
        pub updated_at: DateTime<Utc>,
        #[serde(rename = "createdById")]
        pub created_by_id: String,
        #[serde(rename = "createdBy", skip_serializing_if = "Option::is_none")]
        pub created_by: Option<Box<super::User>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum UniqueWhere {
        Id(i32),
    }

    impl UniqueFilter for UniqueWhere {
        fn into_filter(self) -> Filter {
            match self {
                Self::Id(v) => Filter::Equals("id".into(), v.into()),
            }
        }

        fn columns(&self) -> &'static [&'static str] {
            &["id"]
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CreateInput {
        pub id: Option<i32>,
        pub name: String,
        pub created_at: Option<DateTime<Utc>>,
        pub updated_at: Option<DateTime<Utc>>,
        pub created_by_id: String,
    }

    impl CreateData for CreateInput {
        fn into_values(self) -> Vec<(&'static str, FilterValue)> {
            let mut values = Vec::new();
            if let Some(v) = self.id {
                values.push(("id", v.into()));
            }
            values.push(("name", self.name.into()));
            if let Some(v) = self.created_at {
                values.push(("createdAt", v.into()));
            }
            if let Some(v) = self.updated_at {
                values.push(("updatedAt", v.into()));
            }
            values.push(("createdById", self.created_by_id.into()));
            values
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct UpdateInput {
        pub id: Option<NumberUpdate<i32>>,
        pub name: Option<String>,
        pub updated_at: Option<DateTime<Utc>>,
    }

    impl UpdateData for UpdateInput {
        fn into_assignments(self) -> Vec<(&'static str, Assignment)> {
            let mut assignments = Vec::new();
            if let Some(v) = self.id {
                assignments.push(("id", v.into()));
            }
            if let Some(v) = self.name {
                assignments.push(("name", Assignment::Set(v.into())));
            }
            if let Some(v) = self.updated_at {
                assignments.push(("updatedAt", Assignment::Set(v.into())));
            }
            assignments
        }
    }

    impl Model for Post {
        const MODEL_NAME: &'static str = "Post";
        const TABLE_NAME: &'static str = "Post";

        type ScalarField = ScalarField;
        type UniqueWhere = UniqueWhere;
        type CreateInput = CreateInput;
        type UpdateInput = UpdateInput;

        fn meta() -> &'static ModelMeta {
            &META
        }
    }
}
