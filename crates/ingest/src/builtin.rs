/// Story used when the source argument is the `Cinderella` keyword.
pub const CINDERELLA: &str = "
Once upon a time, there was a young girl named Cinderella. She lived with her
wicked stepmother and two ugly stepsisters who treated her like a servant.
One day, the King announced a grand ball to find a bride for the Prince.
Cinderella wanted to go, but her stepfamily forbade it and ruined her dress.

A Fairy Godmother appeared and transformed a pumpkin into a carriage, mice
into horses, and her rags into a beautiful gown with glass slippers. She
warned Cinderella the magic would end at midnight.

At the ball, the Prince fell in love with her. They danced all night. As the
clock struck twelve, she fled, losing one glass slipper.

The Prince searched the kingdom. The stepsisters tried to force the shoe on,
but it only fit Cinderella. The Prince recognized her, they married, and
lived happily ever after.
";

pub const CINDERELLA_KEYWORD: &str = "cinderella";
