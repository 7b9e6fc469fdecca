use crate::aws::RoleArn;

/// Profile names for `arn`: one per alias, or the bare account id when the
/// account has no alias. Role ARNs get `-{role_name}` appended.
///
/// A non-role ARN yields unsuffixed names, which may coincide with the base
/// identity's own profile.
pub fn name_candidates<'a>(
    arn: &'a RoleArn,
    aliases: &'a [String],
) -> impl Iterator<Item = String> + 'a {
    let prefixes: Box<dyn Iterator<Item = &'a str> + 'a> = if aliases.is_empty() {
        Box::new(std::iter::once(arn.account_id()))
    } else {
        Box::new(aliases.iter().map(String::as_str))
    };

    prefixes.map(move |prefix| {
        if arn.is_role() {
            format!("{}-{}", prefix, arn.role_name())
        } else {
            prefix.to_string()
        }
    })
}
