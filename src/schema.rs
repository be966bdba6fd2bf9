//! Diesel table definitions.

diesel::table! {
    roles (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        kind -> Text,
        permissions -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        password -> Text,
        username -> Text,
        avatar_url -> Nullable<Text>,
        native_language -> Nullable<Text>,
        learning_languages -> Text,
        current_country -> Nullable<Text>,
        status_message -> Nullable<Text>,
        bio -> Nullable<Text>,
        instagram -> Nullable<Text>,
        miles -> Integer,
        registered_at -> Timestamp,
        last_login_at -> Timestamp,
        notify_event_reminders -> Bool,
        notify_new_posts -> Bool,
        notify_new_learning -> Bool,
    }
}

diesel::table! {
    user_roles (user_id, role_id) {
        user_id -> Integer,
        role_id -> Integer,
    }
}

diesel::table! {
    categories (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        position -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    channels (id) {
        id -> Integer,
        category_id -> Integer,
        name -> Text,
        description -> Text,
        position -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    channel_permissions (channel_id, role_id, access) {
        channel_id -> Integer,
        role_id -> Integer,
        access -> Text,
    }
}

diesel::table! {
    posts (id) {
        id -> Integer,
        channel_id -> Integer,
        author_id -> Integer,
        content -> Text,
        images -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    post_likes (post_id, user_id) {
        post_id -> Integer,
        user_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    comments (id) {
        id -> Integer,
        post_id -> Integer,
        author_id -> Integer,
        content -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    events (id) {
        id -> Integer,
        title -> Text,
        description -> Text,
        flyer_image_url -> Nullable<Text>,
        starts_at -> Timestamp,
        venue -> Text,
        visitor_price -> Integer,
        member_price -> Integer,
        created_by -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    event_participants (event_id, user_id) {
        event_id -> Integer,
        user_id -> Integer,
        registered_at -> Timestamp,
    }
}

diesel::table! {
    learning_articles (id) {
        id -> Integer,
        title -> Text,
        subtitle -> Nullable<Text>,
        cover_image_url -> Nullable<Text>,
        category -> Text,
        content_url -> Text,
        miles_reward -> Integer,
        created_by -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    learning_completions (article_id, user_id) {
        article_id -> Integer,
        user_id -> Integer,
        rating -> Integer,
        completed_at -> Timestamp,
    }
}

diesel::table! {
    shop_items (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        image_url -> Nullable<Text>,
        mile_cost -> Integer,
        item_type -> Text,
        discount_value -> Nullable<Integer>,
        stock -> Integer,
        active -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    mile_transactions (id) {
        id -> Integer,
        user_id -> Integer,
        amount -> Integer,
        kind -> Text,
        description -> Text,
        related_id -> Nullable<Integer>,
        related_type -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(user_roles -> users (user_id));
diesel::joinable!(user_roles -> roles (role_id));
diesel::joinable!(channels -> categories (category_id));
diesel::joinable!(channel_permissions -> channels (channel_id));
diesel::joinable!(channel_permissions -> roles (role_id));
diesel::joinable!(posts -> channels (channel_id));
diesel::joinable!(posts -> users (author_id));
diesel::joinable!(post_likes -> posts (post_id));
diesel::joinable!(post_likes -> users (user_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(comments -> users (author_id));
diesel::joinable!(events -> users (created_by));
diesel::joinable!(event_participants -> events (event_id));
diesel::joinable!(event_participants -> users (user_id));
diesel::joinable!(learning_articles -> users (created_by));
diesel::joinable!(learning_completions -> learning_articles (article_id));
diesel::joinable!(learning_completions -> users (user_id));
diesel::joinable!(mile_transactions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    roles,
    users,
    user_roles,
    categories,
    channels,
    channel_permissions,
    posts,
    post_likes,
    comments,
    events,
    event_participants,
    learning_articles,
    learning_completions,
    shop_items,
    mile_transactions,
);
