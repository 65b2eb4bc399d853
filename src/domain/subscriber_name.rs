use unicode_segmentation::UnicodeSegmentation;

const MIN_CHAR_LENGTH: usize = 2;
const MAX_CHAR_LENGTH: usize = 256;

#[derive(Debug, Clone)]
pub struct SubscriberName(String);

impl SubscriberName {
    pub fn parse(name: String) -> Result<SubscriberName, String> {
        let name = name.trim().to_string();
        let length = name.graphemes(true).count();
        let is_too_short = length < MIN_CHAR_LENGTH;
        let is_too_long = length > MAX_CHAR_LENGTH;

        if is_too_short || is_too_long {
            return Err(format!("{} is not a valid subscriber name", name));
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
