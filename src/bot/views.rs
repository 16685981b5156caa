//! Prompt texts and inline keyboards shown to users.
//!
//! Everything user-facing lives here so handlers stay free of literal
//! strings. Texts are in Arabic, matching the audience of the groups
//! the gate runs in.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::storage::GateConfig;

/// Callback action identifier carried by the verify button
pub const CHECK_SUBSCRIPTION_CALLBACK: &str = "check_subscription";

/// Rejection for configuration commands issued in private chats
pub const GROUPS_ONLY: &str = "هذا الأمر متاح فقط في المجموعات.";

/// Rejection for configuration commands issued by non-admins
pub const ADMINS_ONLY: &str = "عذراً، هذا الأمر متاح فقط للمشرفين.";

/// Rejection when the invoker's role could not be resolved
pub const ROLE_CHECK_FAILED: &str = "حدث خطأ في التحقق من صلاحياتك.";

/// Prompt opening the set-channel exchange
pub const CHANNEL_PROMPT: &str =
    "الرجاء إرسال معرف القناة المطلوبة للاشتراك.\nيجب أن يبدأ المعرف بـ @ مثل: @channel_name";

/// Correction for a submission without the @ prefix
pub const CHANNEL_NEEDS_SIGIL: &str = "يجب أن يبدأ معرف القناة بـ @";

/// Acknowledgement for /cancel
pub const CANCELLED: &str = "تم إلغاء العملية.";

/// Usage hint for /setmessage without an argument
pub const SET_MESSAGE_USAGE: &str =
    "الرجاء إدخال نص الرسالة بعد الأمر.\nمثال: /setmessage يجب عليك الاشتراك في القناة أولاً!";

/// Greeting sent by /start
#[must_use]
pub fn greeting(first_name: &str, welcome_message: &str) -> String {
    format!("مرحباً {first_name}! {welcome_message}")
}

/// Confirmation after the required channel was changed
#[must_use]
pub fn channel_set(title: &str, channel: &str) -> String {
    format!("تم تعيين القناة المطلوبة: {title} ({channel})")
}

/// Rejection when a submitted channel could not be resolved
#[must_use]
pub fn channel_rejected(error: &str) -> String {
    format!(
        "خطأ: لا يمكن العثور على القناة. تأكد من صحة المعرف وأن البوت عضو في القناة.\n{error}"
    )
}

/// Confirmation after the notification message was changed
#[must_use]
pub fn message_set(text: &str) -> String {
    format!("تم تعيين رسالة التنبيه: {text}")
}

/// Current configuration, rendered for /status
#[must_use]
pub fn status_report(config: &GateConfig) -> String {
    format!(
        "📊 حالة البوت والإعدادات الحالية:\n\n\
         🔹 القناة المطلوبة: {}\n\
         🔹 رسالة الترحيب: {}\n\
         🔹 رسالة عدم الاشتراك: {}\n\
         🔹 رسالة الاشتراك: {}\n\
         🔹 المجموعة المستهدفة: {}\n\n\
         📝 الأوامر المتاحة:\n\
         /setchannel - تعيين القناة المطلوبة\n\
         /setmessage - تعيين رسالة التنبيه\n\
         /status - عرض حالة البوت",
        config.required_channel,
        config.welcome_message,
        config.not_subscribed_message,
        config.subscribed_message,
        config.target_group,
    )
}

/// Subscribe/verify keyboard attached to every gate prompt.
///
/// The join-link row is dropped when the channel has no public link;
/// the verify button alone still lets the user finish the flow once
/// they have joined by other means.
#[must_use]
pub fn subscription_keyboard(join_link: Option<Url>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(link) = join_link {
        rows.push(vec![InlineKeyboardButton::url("الاشتراك في القناة", link)]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "تحقق من الاشتراك",
        CHECK_SUBSCRIPTION_CALLBACK,
    )]);
    InlineKeyboardMarkup::new(rows)
}
