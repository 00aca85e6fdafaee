diesel::table! {
    users (id) {
        id -> Uuid,
        provider_id -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        username -> Varchar,
        email -> Varchar,
        avatar_url -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    companies (id) {
        id -> Uuid,
        name -> Varchar,
        code -> Varchar,
        creator_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    teams (id) {
        id -> Uuid,
        company_id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    team_members (id) {
        id -> Uuid,
        team_id -> Uuid,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    memberships (id) {
        id -> Uuid,
        user_id -> Uuid,
        company_id -> Uuid,
        role -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    objectives (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        objective_type -> Varchar,
        owner_id -> Uuid,
        company_id -> Uuid,
        team_id -> Nullable<Uuid>,
        status -> Varchar,
        start_date -> Timestamptz,
        end_date -> Timestamptz,
        progress -> Numeric,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    key_results (id) {
        id -> Uuid,
        objective_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        metric_type -> Varchar,
        current_value -> Numeric,
        target_value -> Numeric,
        progress -> Numeric,
        status -> Varchar,
        assignee_type -> Varchar,
        assignee_id -> Uuid,
        start_date -> Timestamptz,
        due_date -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(teams -> companies (company_id));
diesel::joinable!(team_members -> teams (team_id));
diesel::joinable!(team_members -> users (user_id));
diesel::joinable!(memberships -> users (user_id));
diesel::joinable!(memberships -> companies (company_id));
diesel::joinable!(objectives -> companies (company_id));
diesel::joinable!(key_results -> objectives (objective_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    companies,
    teams,
    team_members,
    memberships,
    objectives,
    key_results,
);
